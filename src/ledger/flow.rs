use primitive_types::U256;

use crate::{
    error::{RateLimitError, quota_exceeded},
    ledger::types::{FlowKey, FlowState},
    quota::QuotaConfig,
    types::{Amount, PacketDirection, UnixSeconds},
};

const PERCENT_SCALE: u64 = 100;

impl FlowState {
    pub fn open(
        key: &FlowKey,
        channel_value: Amount,
        window_duration_secs: u64,
        now: UnixSeconds,
    ) -> Self {
        Self {
            channel_id: key.channel_id.clone(),
            denom: key.denom.clone(),
            inflow: Amount::zero(),
            outflow: Amount::zero(),
            channel_value,
            window_start: now,
            window_duration_secs,
        }
    }

    pub fn key(&self) -> FlowKey {
        FlowKey::new(self.channel_id.clone(), self.denom.clone())
    }

    pub fn flow(&self, direction: PacketDirection) -> Amount {
        match direction {
            PacketDirection::Send => self.outflow,
            PacketDirection::Receive => self.inflow,
        }
    }

    pub fn window_end(&self) -> UnixSeconds {
        self.window_start.saturating_add(self.window_duration_secs)
    }

    pub fn is_window_expired(&self, now: UnixSeconds) -> bool {
        now >= self.window_end()
    }

    /// Starts a fresh window aligned to the previous one, so the new start is
    /// the latest boundary at or before `now`. A changed duration has no
    /// boundary grid to align to and restarts at `now`.
    pub fn roll_window(
        &mut self,
        now: UnixSeconds,
        channel_value: Amount,
        window_duration_secs: u64,
    ) {
        self.window_start = if window_duration_secs == 0
            || window_duration_secs != self.window_duration_secs
        {
            now
        } else {
            let elapsed = now.saturating_sub(self.window_start);
            self.window_start + (elapsed / window_duration_secs) * window_duration_secs
        };
        self.window_duration_secs = window_duration_secs;
        self.inflow = Amount::zero();
        self.outflow = Amount::zero();
        self.channel_value = channel_value;
    }

    pub fn add_flow(
        &mut self,
        direction: PacketDirection,
        amount: Amount,
        quota: &QuotaConfig,
    ) -> Result<Amount, RateLimitError> {
        let max_percent = quota.max_percent(direction);
        let current = self.flow(direction);
        let prospective = current
            .checked_add(amount)
            .filter(|flow| !exceeds_quota(*flow, self.channel_value, max_percent))
            .ok_or_else(|| {
                quota_exceeded(format!(
                    "{direction} quota exceeded for {}/{}: flow={current}, amount={amount}, channel_value={}, max_percent={max_percent}",
                    self.channel_id, self.denom, self.channel_value
                ))
            })?;

        match direction {
            PacketDirection::Send => self.outflow = prospective,
            PacketDirection::Receive => self.inflow = prospective,
        }
        Ok(prospective)
    }

    /// Returns the amount actually removed; a rollover since the send may have
    /// already zeroed part of it.
    pub fn reverse_outflow(&mut self, amount: Amount) -> Amount {
        let remaining = self.outflow.saturating_sub(amount);
        let reversed = self.outflow.saturating_sub(remaining);
        self.outflow = remaining;
        reversed
    }
}

/// `flow / channel_value > max_percent / 100`, evaluated without division.
/// A zero channel value cannot express a percentage and never exceeds.
fn exceeds_quota(flow: Amount, channel_value: Amount, max_percent: u32) -> bool {
    if channel_value.is_zero() {
        return false;
    }
    let scaled_flow = flow.as_u256().full_mul(U256::from(PERCENT_SCALE));
    let threshold = channel_value.as_u256().full_mul(U256::from(max_percent));
    scaled_flow > threshold
}
