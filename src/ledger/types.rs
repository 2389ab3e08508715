use serde::{Deserialize, Serialize};

use crate::types::{Amount, ChannelId, Denom, Sequence, UnixSeconds};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub channel_id: ChannelId,
    pub denom: Denom,
}

impl FlowKey {
    pub fn new(channel_id: impl Into<String>, denom: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            denom: denom.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub channel_id: ChannelId,
    pub denom: Denom,
    pub inflow: Amount,
    pub outflow: Amount,
    pub channel_value: Amount,
    pub window_start: UnixSeconds,
    pub window_duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PendingSendKey {
    pub channel_id: ChannelId,
    pub sequence: Sequence,
}

impl PendingSendKey {
    pub fn new(channel_id: impl Into<String>, sequence: Sequence) -> Self {
        Self {
            channel_id: channel_id.into(),
            sequence,
        }
    }
}

/// An admitted send whose outflow may still be reversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSendEntry {
    pub channel_id: ChannelId,
    pub sequence: Sequence,
    pub denom: Denom,
    pub amount: Amount,
    pub registered_at: UnixSeconds,
}

impl PendingSendEntry {
    pub fn key(&self) -> PendingSendKey {
        PendingSendKey::new(self.channel_id.clone(), self.sequence)
    }
}
