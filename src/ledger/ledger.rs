use std::collections::BTreeMap;

use crate::{
    error::RateLimitError,
    ledger::{
        pending::PendingSendRegistry,
        types::{FlowKey, FlowState, PendingSendEntry},
    },
    quota::QuotaStore,
    types::{Amount, PacketDirection, TransferRecord, UnixSeconds},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowUpdate {
    pub changed: bool,
    pub rolled_over: bool,
}

impl FlowUpdate {
    fn untracked() -> Self {
        Self {
            changed: false,
            rolled_over: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowLedger {
    flows: BTreeMap<FlowKey, FlowState>,
    pending_sends: PendingSendRegistry,
}

impl FlowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        flows: impl IntoIterator<Item = FlowState>,
        pending_sends: impl IntoIterator<Item = PendingSendEntry>,
    ) -> Self {
        Self {
            flows: flows
                .into_iter()
                .map(|state| (state.key(), state))
                .collect(),
            pending_sends: pending_sends.into_iter().collect(),
        }
    }

    pub fn flows(&self) -> impl Iterator<Item = &FlowState> {
        self.flows.values()
    }

    pub fn flow(&self, channel_id: &str, denom: &str) -> Option<&FlowState> {
        self.flows.get(&FlowKey::new(channel_id, denom))
    }

    pub fn pending_sends(&self) -> &PendingSendRegistry {
        &self.pending_sends
    }

    pub fn pending_sends_mut(&mut self) -> &mut PendingSendRegistry {
        &mut self.pending_sends
    }

    /// Admission decision for one transfer. Transfers without a quota are not
    /// tracked at all. A rejected transfer leaves the ledger exactly as it was,
    /// including any window rollover it would have triggered.
    pub fn check_and_update(
        &mut self,
        direction: PacketDirection,
        record: &TransferRecord,
        quotas: &dyn QuotaStore,
        now: UnixSeconds,
    ) -> Result<FlowUpdate, RateLimitError> {
        let Some(quota) = quotas.quota(&record.channel_id, &record.denom) else {
            return Ok(FlowUpdate::untracked());
        };

        let key = FlowKey::new(record.channel_id.clone(), record.denom.clone());
        let mut state = match self.flows.get(&key) {
            Some(state) => state.clone(),
            None => FlowState::open(
                &key,
                quotas.channel_value(&key.channel_id, &key.denom),
                quota.window_duration_secs,
                now,
            ),
        };

        let rolled_over = state.is_window_expired(now);
        if rolled_over {
            state.roll_window(
                now,
                quotas.channel_value(&key.channel_id, &key.denom),
                quota.window_duration_secs,
            );
        }

        if state.channel_value.is_zero() {
            tracing::warn!(
                target: "ratelimit",
                channel_id = %key.channel_id,
                denom = %key.denom,
                "channel_value_zero_quota_unenforced"
            );
        }

        state.add_flow(direction, record.amount, &quota)?;
        self.flows.insert(key, state);

        Ok(FlowUpdate {
            changed: true,
            rolled_over,
        })
    }

    /// Gives a failed send's outflow back to the window it was counted in.
    /// Returns `None` when that window is gone: the flow is no longer tracked,
    /// or the send was admitted before the current window started and its
    /// amount was already cleared by the rollover.
    pub fn reverse_send(&mut self, entry: &PendingSendEntry) -> Option<Amount> {
        let state = self
            .flows
            .get_mut(&FlowKey::new(entry.channel_id.as_str(), entry.denom.as_str()))?;
        if entry.registered_at < state.window_start {
            return None;
        }
        Some(state.reverse_outflow(entry.amount))
    }
}
