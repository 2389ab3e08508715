use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use crate::{
    ack::{DeliveryOutcome, parse_acknowledgement},
    config::LedgerRuntimeConfig,
    error::{RateLimitError, RateLimitErrorKind},
    ledger::{FlowLedger, FlowState, FlowUpdate, PendingSendEntry},
    packet::extract_transfer_record,
    persistence::LedgerPersistence,
    quota::QuotaStore,
    telemetry::{RateLimitTelemetryEvent, RateLimitTelemetryHook, trace_event},
    types::{Amount, Packet, PacketContext, PacketDirection, Sequence, TransferRecord},
};

/// What an acknowledgement or timeout did to a previously sent packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No pending entry: the asset was unlimited at send time, or the packet
    /// was already resolved.
    Untracked,
    /// Delivered; the counted outflow stays consumed.
    Retained(PendingSendEntry),
    /// Failed or timed out; `reversed` is what was actually subtracted.
    Reversed {
        entry: PendingSendEntry,
        reversed: Amount,
    },
    /// Failed or timed out, but admitted in a window that has since rolled
    /// over. Nothing is given back to the current window.
    Expired(PendingSendEntry),
}

pub struct RateLimiter {
    quotas: Arc<dyn QuotaStore>,
    ledger: FlowLedger,
    persistence: Option<LedgerPersistence>,
    telemetry_hook: Option<RateLimitTelemetryHook>,
}

impl RateLimiter {
    pub fn new(quotas: Arc<dyn QuotaStore>) -> Self {
        Self {
            quotas,
            ledger: FlowLedger::new(),
            persistence: None,
            telemetry_hook: None,
        }
    }

    /// Restores the ledger from `persistence` and flushes every committed
    /// mutation back to it.
    pub fn with_persistence(
        quotas: Arc<dyn QuotaStore>,
        persistence: LedgerPersistence,
    ) -> Result<Self, RateLimitError> {
        let ledger = persistence.load()?.unwrap_or_default();
        tracing::info!(
            target: "ratelimit",
            path = %persistence.path().display(),
            flows = ledger.flows().count(),
            pending_sends = ledger.pending_sends().len(),
            "ledger_restored"
        );
        Ok(Self {
            quotas,
            ledger,
            persistence: Some(persistence),
            telemetry_hook: None,
        })
    }

    pub fn from_config(
        config: &LedgerRuntimeConfig,
        quotas: Arc<dyn QuotaStore>,
    ) -> Result<Self, RateLimitError> {
        if config.persist {
            return Self::with_persistence(quotas, LedgerPersistence::new(config.state_path.clone()));
        }
        Ok(Self::new(quotas))
    }

    pub fn with_telemetry_hook(mut self, hook: RateLimitTelemetryHook) -> Self {
        self.telemetry_hook = Some(hook);
        self
    }

    pub fn ledger(&self) -> &FlowLedger {
        &self.ledger
    }

    pub fn flow(&self, channel_id: &str, denom: &str) -> Option<&FlowState> {
        self.ledger.flow(channel_id, denom)
    }

    pub fn pending_send(&self, channel_id: &str, sequence: Sequence) -> Option<&PendingSendEntry> {
        self.ledger.pending_sends().resolve(channel_id, sequence)
    }

    pub fn on_send(&mut self, ctx: &PacketContext, packet: &Packet) -> Result<(), RateLimitError> {
        let record = extract_transfer_record(packet, PacketDirection::Send)?;
        let now = ctx.block_time;

        let update = self.commit(|ledger, quotas| {
            let update = ledger.check_and_update(PacketDirection::Send, &record, quotas, now)?;
            if update.changed {
                let replaced = ledger.pending_sends_mut().register(PendingSendEntry {
                    channel_id: record.channel_id.clone(),
                    sequence: packet.sequence,
                    denom: record.denom.clone(),
                    amount: record.amount,
                    registered_at: now,
                });
                if replaced.is_some() {
                    tracing::warn!(
                        target: "ratelimit",
                        channel_id = %record.channel_id,
                        sequence = packet.sequence,
                        "pending_send_replaced"
                    );
                }
            }
            Ok(update)
        });
        let update = self.observe_flow_update(PacketDirection::Send, &record, update)?;

        if update.changed {
            self.emit(RateLimitTelemetryEvent::PendingSendRegistered {
                channel_id: record.channel_id,
                sequence: packet.sequence,
                denom: record.denom,
                amount: record.amount,
            });
        }
        Ok(())
    }

    pub fn on_receive(&mut self, ctx: &PacketContext, packet: &Packet) -> Result<(), RateLimitError> {
        let record = extract_transfer_record(packet, PacketDirection::Receive)?;
        let now = ctx.block_time;

        let update = self.commit(|ledger, quotas| {
            ledger.check_and_update(PacketDirection::Receive, &record, quotas, now)
        });
        self.observe_flow_update(PacketDirection::Receive, &record, update)?;
        Ok(())
    }

    pub fn on_acknowledge(
        &mut self,
        ctx: &PacketContext,
        packet: &Packet,
        ack: &[u8],
    ) -> Result<Resolution, RateLimitError> {
        let record = extract_transfer_record(packet, PacketDirection::Send)?;
        let outcome = parse_acknowledgement(ack)?;
        self.resolve_send(ctx, packet.sequence, &record, outcome)
    }

    pub fn on_timeout(
        &mut self,
        ctx: &PacketContext,
        packet: &Packet,
    ) -> Result<Resolution, RateLimitError> {
        let record = extract_transfer_record(packet, PacketDirection::Send)?;
        self.resolve_send(ctx, packet.sequence, &record, DeliveryOutcome::Timeout)
    }

    fn resolve_send(
        &mut self,
        ctx: &PacketContext,
        sequence: Sequence,
        record: &TransferRecord,
        outcome: DeliveryOutcome,
    ) -> Result<Resolution, RateLimitError> {
        tracing::debug!(
            target: "ratelimit",
            block_height = ctx.block_height,
            channel_id = %record.channel_id,
            sequence,
            outcome = outcome.as_str(),
            "send_resolution_started"
        );

        let resolution = self.commit(|ledger, _| {
            let Some(entry) = ledger.pending_sends_mut().remove(&record.channel_id, sequence)
            else {
                return Ok(Resolution::Untracked);
            };
            if !outcome.restores_capacity() {
                return Ok(Resolution::Retained(entry));
            }
            Ok(match ledger.reverse_send(&entry) {
                Some(reversed) => Resolution::Reversed { entry, reversed },
                None => Resolution::Expired(entry),
            })
        })?;

        if let Resolution::Untracked = resolution {
            tracing::debug!(
                target: "ratelimit",
                channel_id = %record.channel_id,
                sequence,
                outcome = ?outcome,
                "send_resolution_untracked"
            );
            return Ok(resolution);
        }

        if let DeliveryOutcome::Error(error) = &outcome {
            self.emit(RateLimitTelemetryEvent::AcknowledgementError {
                channel_id: record.channel_id.clone(),
                sequence,
                error: error.clone(),
            });
        }

        match &resolution {
            Resolution::Untracked => {}
            Resolution::Retained(entry) => warn_on_record_mismatch(entry, record),
            Resolution::Expired(entry) => {
                warn_on_record_mismatch(entry, record);
                tracing::info!(
                    target: "ratelimit",
                    channel_id = %entry.channel_id,
                    sequence,
                    denom = %entry.denom,
                    amount = %entry.amount,
                    registered_at = entry.registered_at,
                    outcome = outcome.as_str(),
                    "expired_send_not_reversed"
                );
            }
            Resolution::Reversed { entry, reversed } => {
                warn_on_record_mismatch(entry, record);
                self.emit(RateLimitTelemetryEvent::OutflowReversed {
                    channel_id: entry.channel_id.clone(),
                    sequence,
                    denom: entry.denom.clone(),
                    amount: entry.amount,
                    reversed: *reversed,
                    outcome: outcome.as_str(),
                });
            }
        }

        Ok(resolution)
    }

    fn observe_flow_update(
        &self,
        direction: PacketDirection,
        record: &TransferRecord,
        update: Result<FlowUpdate, RateLimitError>,
    ) -> Result<FlowUpdate, RateLimitError> {
        let update = match update {
            Ok(update) => update,
            Err(err) => {
                if err.kind == RateLimitErrorKind::QuotaExceeded {
                    self.emit(RateLimitTelemetryEvent::QuotaExceeded {
                        direction,
                        channel_id: record.channel_id.clone(),
                        denom: record.denom.clone(),
                        amount: record.amount,
                        reason: err.message.clone(),
                    });
                }
                return Err(err);
            }
        };

        if !update.changed {
            return Ok(update);
        }
        if let Some(state) = self.ledger.flow(&record.channel_id, &record.denom) {
            if update.rolled_over {
                self.emit(RateLimitTelemetryEvent::WindowRolledOver {
                    channel_id: state.channel_id.clone(),
                    denom: state.denom.clone(),
                    window_start: state.window_start,
                    channel_value: state.channel_value,
                });
            }
            self.emit(RateLimitTelemetryEvent::FlowAdmitted {
                direction,
                channel_id: state.channel_id.clone(),
                denom: state.denom.clone(),
                amount: record.amount,
                flow: state.flow(direction),
            });
        }
        Ok(update)
    }

    // Runs one ledger transition. With persistence enabled the result is
    // flushed before returning; a failed flush restores the previous ledger.
    fn commit<T>(
        &mut self,
        op: impl FnOnce(&mut FlowLedger, &dyn QuotaStore) -> Result<T, RateLimitError>,
    ) -> Result<T, RateLimitError> {
        let snapshot = self.persistence.as_ref().map(|_| self.ledger.clone());
        let output = op(&mut self.ledger, self.quotas.as_ref())?;

        let (Some(persistence), Some(snapshot)) = (&self.persistence, snapshot) else {
            return Ok(output);
        };
        if snapshot == self.ledger {
            return Ok(output);
        }
        if let Err(err) = persistence.save(&self.ledger) {
            tracing::error!(
                target: "ratelimit",
                path = %persistence.path().display(),
                error = %err,
                "ledger_flush_failed"
            );
            self.ledger = snapshot;
            return Err(err);
        }

        Ok(output)
    }

    // The decision is already committed when the host hook runs; a panicking
    // hook is logged and otherwise ignored.
    fn emit(&self, event: RateLimitTelemetryEvent) {
        trace_event(&event);
        let Some(hook) = &self.telemetry_hook else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| hook(event))).is_err() {
            tracing::warn!(target: "ratelimit", "telemetry_hook_panicked");
        }
    }
}

fn warn_on_record_mismatch(entry: &PendingSendEntry, record: &TransferRecord) {
    if entry.denom != record.denom || entry.amount != record.amount {
        tracing::warn!(
            target: "ratelimit",
            channel_id = %entry.channel_id,
            sequence = entry.sequence,
            pending_denom = %entry.denom,
            pending_amount = %entry.amount,
            packet_denom = %record.denom,
            packet_amount = %record.amount,
            "pending_send_packet_mismatch"
        );
    }
}
