use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

use anyhow::Result;

use crate::{
    quota::types::{QuotaConfig, QuotaScope},
    types::{Amount, ChannelId, Denom},
};

/// Read-only view of quota configuration owned by the host chain.
pub trait QuotaStore: Send + Sync {
    fn quota(&self, channel_id: &str, denom: &str) -> Option<QuotaConfig>;

    /// Reference value used as the denominator of the percentage thresholds.
    /// Read once per quota window.
    fn channel_value(&self, channel_id: &str, denom: &str) -> Amount;
}

#[derive(Debug, Default)]
struct StaticQuotaTables {
    quotas: BTreeMap<QuotaScope, QuotaConfig>,
    channel_values: BTreeMap<(ChannelId, Denom), Amount>,
    denom_values: BTreeMap<Denom, Amount>,
}

/// In-memory quota store for hosts that manage configuration themselves.
#[derive(Debug, Default)]
pub struct StaticQuotaStore {
    tables: RwLock<StaticQuotaTables>,
}

impl StaticQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_quota(&self, scope: QuotaScope, quota: QuotaConfig) -> Result<()> {
        quota.validate()?;
        self.write(|tables| {
            tables.quotas.insert(scope, quota);
        });
        Ok(())
    }

    pub fn remove_quota(&self, scope: &QuotaScope) -> Option<QuotaConfig> {
        self.write(|tables| tables.quotas.remove(scope))
    }

    pub fn set_channel_value(
        &self,
        channel_id: impl Into<String>,
        denom: impl Into<String>,
        value: Amount,
    ) {
        self.write(|tables| {
            tables
                .channel_values
                .insert((channel_id.into(), denom.into()), value);
        });
    }

    /// Fallback value for a denom on channels without their own entry.
    pub fn set_denom_value(&self, denom: impl Into<String>, value: Amount) {
        self.write(|tables| {
            tables.denom_values.insert(denom.into(), value);
        });
    }

    fn read<T>(&self, f: impl FnOnce(&StaticQuotaTables) -> T) -> T {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        f(&tables)
    }

    fn write<T>(&self, f: impl FnOnce(&mut StaticQuotaTables) -> T) -> T {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }
}

impl QuotaStore for StaticQuotaStore {
    fn quota(&self, channel_id: &str, denom: &str) -> Option<QuotaConfig> {
        self.read(|tables| {
            QuotaScope::lookup_order(channel_id, denom)
                .iter()
                .find_map(|scope| tables.quotas.get(scope).cloned())
        })
    }

    fn channel_value(&self, channel_id: &str, denom: &str) -> Amount {
        self.read(|tables| {
            tables
                .channel_values
                .get(&(channel_id.to_string(), denom.to_string()))
                .or_else(|| tables.denom_values.get(denom))
                .copied()
                .unwrap_or_default()
        })
    }
}
