use std::sync::Arc;

use crate::types::{Amount, ChannelId, Denom, PacketDirection, Sequence, UnixSeconds};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitTelemetryEvent {
    FlowAdmitted {
        direction: PacketDirection,
        channel_id: ChannelId,
        denom: Denom,
        amount: Amount,
        flow: Amount,
    },
    QuotaExceeded {
        direction: PacketDirection,
        channel_id: ChannelId,
        denom: Denom,
        amount: Amount,
        reason: String,
    },
    WindowRolledOver {
        channel_id: ChannelId,
        denom: Denom,
        window_start: UnixSeconds,
        channel_value: Amount,
    },
    PendingSendRegistered {
        channel_id: ChannelId,
        sequence: Sequence,
        denom: Denom,
        amount: Amount,
    },
    OutflowReversed {
        channel_id: ChannelId,
        sequence: Sequence,
        denom: Denom,
        amount: Amount,
        reversed: Amount,
        outcome: &'static str,
    },
    AcknowledgementError {
        channel_id: ChannelId,
        sequence: Sequence,
        error: String,
    },
}

pub type RateLimitTelemetryHook = Arc<dyn Fn(RateLimitTelemetryEvent) + Send + Sync>;

pub(crate) fn trace_event(event: &RateLimitTelemetryEvent) {
    match event {
        RateLimitTelemetryEvent::FlowAdmitted {
            direction,
            channel_id,
            denom,
            amount,
            flow,
        } => {
            tracing::debug!(
                target: "ratelimit",
                direction = direction.as_str(),
                channel_id = %channel_id,
                denom = %denom,
                amount = %amount,
                flow = %flow,
                "flow_admitted"
            );
        }
        RateLimitTelemetryEvent::QuotaExceeded {
            direction,
            channel_id,
            denom,
            amount,
            reason,
        } => {
            tracing::warn!(
                target: "ratelimit",
                direction = direction.as_str(),
                channel_id = %channel_id,
                denom = %denom,
                amount = %amount,
                reason = %reason,
                "quota_exceeded"
            );
        }
        RateLimitTelemetryEvent::WindowRolledOver {
            channel_id,
            denom,
            window_start,
            channel_value,
        } => {
            tracing::info!(
                target: "ratelimit",
                channel_id = %channel_id,
                denom = %denom,
                window_start = *window_start,
                channel_value = %channel_value,
                "window_rolled_over"
            );
        }
        RateLimitTelemetryEvent::PendingSendRegistered {
            channel_id,
            sequence,
            denom,
            amount,
        } => {
            tracing::debug!(
                target: "ratelimit",
                channel_id = %channel_id,
                sequence = *sequence,
                denom = %denom,
                amount = %amount,
                "pending_send_registered"
            );
        }
        RateLimitTelemetryEvent::OutflowReversed {
            channel_id,
            sequence,
            denom,
            amount,
            reversed,
            outcome,
        } => {
            tracing::info!(
                target: "ratelimit",
                channel_id = %channel_id,
                sequence = *sequence,
                denom = %denom,
                amount = %amount,
                reversed = %reversed,
                outcome = *outcome,
                "outflow_reversed"
            );
        }
        RateLimitTelemetryEvent::AcknowledgementError {
            channel_id,
            sequence,
            error,
        } => {
            tracing::error!(
                target: "ratelimit",
                channel_id = %channel_id,
                sequence = *sequence,
                error = %error,
                "acknowledgement_error"
            );
        }
    }
}
