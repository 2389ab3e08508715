mod flow_accounting;
mod persistence;
