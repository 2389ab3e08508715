pub mod store;
pub mod types;

pub use store::{QuotaStore, StaticQuotaStore};
pub use types::{QuotaConfig, QuotaScope};
