use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, Denom, PacketDirection};

const MAX_PERCENT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub max_outflow_percent: u32,
    pub max_inflow_percent: u32,
    pub window_duration_secs: u64,
}

impl QuotaConfig {
    pub fn new(
        max_outflow_percent: u32,
        max_inflow_percent: u32,
        window_duration_secs: u64,
    ) -> Result<Self> {
        let quota = Self {
            max_outflow_percent,
            max_inflow_percent,
            window_duration_secs,
        };
        quota.validate()?;
        Ok(quota)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_outflow_percent > MAX_PERCENT {
            return Err(anyhow!(
                "max_outflow_percent must be at most {MAX_PERCENT}, got {}",
                self.max_outflow_percent
            ));
        }
        if self.max_inflow_percent > MAX_PERCENT {
            return Err(anyhow!(
                "max_inflow_percent must be at most {MAX_PERCENT}, got {}",
                self.max_inflow_percent
            ));
        }
        if self.window_duration_secs == 0 {
            return Err(anyhow!("window_duration_secs must be positive"));
        }
        Ok(())
    }

    pub fn max_percent(&self, direction: PacketDirection) -> u32 {
        match direction {
            PacketDirection::Send => self.max_outflow_percent,
            PacketDirection::Receive => self.max_inflow_percent,
        }
    }
}

/// Where a quota applies. Lookups prefer the most specific scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuotaScope {
    Path { channel_id: ChannelId, denom: Denom },
    Channel { channel_id: ChannelId },
    Denom { denom: Denom },
    Global,
}

impl QuotaScope {
    pub fn path(channel_id: impl Into<String>, denom: impl Into<String>) -> Self {
        Self::Path {
            channel_id: channel_id.into(),
            denom: denom.into(),
        }
    }

    pub fn lookup_order(channel_id: &str, denom: &str) -> [QuotaScope; 4] {
        [
            Self::path(channel_id, denom),
            Self::Channel {
                channel_id: channel_id.to_string(),
            },
            Self::Denom {
                denom: denom.to_string(),
            },
            Self::Global,
        ]
    }
}
