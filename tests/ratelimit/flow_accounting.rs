use std::sync::Arc;

use ibc_ratelimit::{
    RateLimitErrorKind, RateLimiter,
    denom::resolve_receive_denom,
    quota::{QuotaConfig, QuotaScope, StaticQuotaStore},
    telemetry::RateLimitTelemetryEvent,
    types::{Amount, Packet},
};

use crate::support::{
    COUNTERPARTY_CHANNEL, LOCAL_CHANNEL, NATIVE_DENOM, WINDOW_SECS, ctx, native_quota_store,
    outflow, receive_packet, recording_hook, send_packet, transfer_data,
};

#[test]
fn given_outflow_at_threshold_when_one_more_unit_is_sent_then_it_is_rejected() {
    let mut limiter = RateLimiter::new(native_quota_store(10, 1_000));

    limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "60"))
        .expect("60 of 1000 is within 10%");
    limiter
        .on_send(&ctx(1_010), &send_packet(2, NATIVE_DENOM, "40"))
        .expect("exactly 10% is still admitted");
    assert_eq!(outflow(&limiter), Amount::from(100u64));

    let err = limiter
        .on_send(&ctx(1_020), &send_packet(3, NATIVE_DENOM, "1"))
        .expect_err("101 of 1000 exceeds 10%");
    assert_eq!(err.kind, RateLimitErrorKind::QuotaExceeded);
    assert_eq!(outflow(&limiter), Amount::from(100u64));
    assert!(limiter.pending_send(LOCAL_CHANNEL, 3).is_none());
    assert!(limiter.pending_send(LOCAL_CHANNEL, 2).is_some());
}

#[test]
fn given_rejected_transfer_when_inspecting_ledger_then_nothing_changed() {
    let mut limiter = RateLimiter::new(native_quota_store(10, 1_000));
    limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "90"))
        .expect("first send admitted");

    let before = limiter.ledger().clone();
    limiter
        .on_send(&ctx(1_001), &send_packet(2, NATIVE_DENOM, "11"))
        .expect_err("second send overflows the window");
    assert_eq!(limiter.ledger(), &before);
}

#[test]
fn given_elapsed_window_when_next_transfer_arrives_then_window_resets_exactly_once() {
    let (hook, events) = recording_hook();
    let mut limiter =
        RateLimiter::new(native_quota_store(10, 1_000)).with_telemetry_hook(hook);

    limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "100"))
        .expect("first window is filled");
    limiter
        .on_send(&ctx(1_000 + WINDOW_SECS), &send_packet(2, NATIVE_DENOM, "100"))
        .expect("boundary instant opens a fresh window");

    let state = limiter
        .flow(LOCAL_CHANNEL, NATIVE_DENOM)
        .expect("flow should be tracked");
    assert_eq!(state.window_start, 1_000 + WINDOW_SECS);
    assert_eq!(state.outflow, Amount::from(100u64));

    limiter
        .on_send(&ctx(1_100 + WINDOW_SECS), &send_packet(3, NATIVE_DENOM, "1"))
        .expect_err("second window is already full");

    let rollovers = events
        .lock()
        .expect("event lock")
        .iter()
        .filter(|event| matches!(event, RateLimitTelemetryEvent::WindowRolledOver { .. }))
        .count();
    assert_eq!(rollovers, 1);
}

#[test]
fn given_rejected_transfer_after_expiry_when_window_would_roll_then_rollover_is_discarded() {
    let mut limiter = RateLimiter::new(native_quota_store(10, 1_000));
    limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "100"))
        .expect("first window is filled");

    limiter
        .on_send(&ctx(9_000), &send_packet(2, NATIVE_DENOM, "500"))
        .expect_err("500 exceeds even a fresh window");

    let state = limiter
        .flow(LOCAL_CHANNEL, NATIVE_DENOM)
        .expect("flow should be tracked");
    assert_eq!(state.window_start, 1_000);
    assert_eq!(state.outflow, Amount::from(100u64));

    limiter
        .on_send(&ctx(9_000), &send_packet(3, NATIVE_DENOM, "100"))
        .expect("fits into the fresh window");
    let state = limiter
        .flow(LOCAL_CHANNEL, NATIVE_DENOM)
        .expect("flow should be tracked");
    assert_eq!(state.window_start, 8_200);
    assert_eq!(state.outflow, Amount::from(100u64));
}

#[test]
fn given_returning_tokens_when_received_then_inflow_is_counted_separately() {
    let mut limiter = RateLimiter::new(native_quota_store(10, 1_000));
    let returning = format!("transfer/{COUNTERPARTY_CHANNEL}/{NATIVE_DENOM}");

    limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "100"))
        .expect("outflow admitted");
    limiter
        .on_receive(&ctx(1_010), &receive_packet(1, &returning, "100"))
        .expect("inflow has its own budget");

    let state = limiter
        .flow(LOCAL_CHANNEL, NATIVE_DENOM)
        .expect("flow should be tracked");
    assert_eq!(state.inflow, Amount::from(100u64));
    assert_eq!(state.outflow, Amount::from(100u64));

    let err = limiter
        .on_receive(&ctx(1_020), &receive_packet(2, &returning, "1"))
        .expect_err("inflow budget is spent");
    assert_eq!(err.kind, RateLimitErrorKind::QuotaExceeded);
}

#[test]
fn given_foreign_token_when_received_then_it_is_keyed_by_local_ibc_hash() {
    let packet = receive_packet(1, "uatom", "50");
    let local_denom = resolve_receive_denom(&packet, "uatom").expect("denom should resolve");

    let store = StaticQuotaStore::new();
    store
        .set_quota(
            QuotaScope::Channel {
                channel_id: LOCAL_CHANNEL.to_string(),
            },
            QuotaConfig::new(5, 5, WINDOW_SECS).expect("quota should be valid"),
        )
        .expect("quota should be stored");
    store.set_channel_value(LOCAL_CHANNEL, local_denom.clone(), Amount::from(1_000u64));

    let mut limiter = RateLimiter::new(Arc::new(store));
    limiter
        .on_receive(&ctx(1_000), &packet)
        .expect("5% inflow admitted");

    let state = limiter
        .flow(LOCAL_CHANNEL, &local_denom)
        .expect("flow keyed by ibc hash");
    assert!(local_denom.starts_with("ibc/"));
    assert_eq!(state.inflow, Amount::from(50u64));
    assert!(limiter.flow(LOCAL_CHANNEL, "uatom").is_none());
}

#[test]
fn given_asset_without_quota_when_transferred_then_nothing_is_tracked() {
    let mut limiter = RateLimiter::new(native_quota_store(10, 1_000));

    limiter
        .on_send(&ctx(1_000), &send_packet(1, "uion", "1000000"))
        .expect("unlimited asset passes");
    limiter
        .on_receive(&ctx(1_000), &receive_packet(1, "uion", "1000000"))
        .expect("unlimited asset passes");

    assert!(limiter.flow(LOCAL_CHANNEL, "uion").is_none());
    assert!(limiter.pending_send(LOCAL_CHANNEL, 1).is_none());
    assert_eq!(limiter.ledger().flows().count(), 0);
}

#[test]
fn given_zero_channel_value_when_sending_then_flow_is_counted_but_not_capped() {
    let mut limiter = RateLimiter::new(native_quota_store(10, 0));

    limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "1000000"))
        .expect("zero channel value cannot express a threshold");
    assert_eq!(outflow(&limiter), Amount::from(1_000_000u64));
    assert!(limiter.pending_send(LOCAL_CHANNEL, 1).is_some());
}

#[test]
fn given_malformed_packets_when_sending_then_typed_errors_leave_ledger_untouched() {
    let mut limiter = RateLimiter::new(native_quota_store(10, 1_000));
    let before = limiter.ledger().clone();

    let mut garbage = send_packet(1, NATIVE_DENOM, "1");
    garbage.data = b"not json".to_vec();
    let mut bad_channel = send_packet(2, NATIVE_DENOM, "1");
    bad_channel.source_channel = "chan-7".to_string();

    let cases: Vec<(Packet, RateLimitErrorKind)> = vec![
        (garbage, RateLimitErrorKind::MalformedPacket),
        (bad_channel, RateLimitErrorKind::MalformedPacket),
        (send_packet(3, NATIVE_DENOM, "-5"), RateLimitErrorKind::InvalidAmount),
        (send_packet(4, NATIVE_DENOM, ""), RateLimitErrorKind::InvalidAmount),
        (send_packet(5, "transfer/channel-0/", "1"), RateLimitErrorKind::MalformedDenom),
        (send_packet(6, "", "1"), RateLimitErrorKind::MalformedDenom),
    ];

    for (packet, kind) in cases {
        let err = limiter
            .on_send(&ctx(1_000), &packet)
            .expect_err("malformed packet must be rejected");
        assert_eq!(err.kind, kind, "packet {}: {err}", packet.sequence);
    }
    assert_eq!(limiter.ledger(), &before);
}

#[test]
fn given_send_events_when_hook_is_installed_then_host_observes_decisions() {
    let (hook, events) = recording_hook();
    let mut limiter =
        RateLimiter::new(native_quota_store(10, 1_000)).with_telemetry_hook(hook);

    limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "100"))
        .expect("admitted");
    limiter
        .on_send(&ctx(1_000), &send_packet(2, NATIVE_DENOM, "1"))
        .expect_err("rejected");

    let events = events.lock().expect("event lock");
    assert!(matches!(
        &events[0],
        RateLimitTelemetryEvent::FlowAdmitted { flow, .. } if *flow == Amount::from(100u64)
    ));
    assert!(matches!(
        &events[1],
        RateLimitTelemetryEvent::PendingSendRegistered { sequence: 1, .. }
    ));
    assert!(matches!(
        &events[2],
        RateLimitTelemetryEvent::QuotaExceeded { amount, .. } if *amount == Amount::from(1u64)
    ));
    assert_eq!(events.len(), 3);
}

#[test]
fn given_packet_data_with_memo_when_sending_then_memo_is_ignored() {
    let mut limiter = RateLimiter::new(native_quota_store(10, 1_000));
    let mut packet = send_packet(1, NATIVE_DENOM, "10");
    let mut data: serde_json::Value =
        serde_json::from_slice(&transfer_data(NATIVE_DENOM, "10")).expect("data is json");
    data["memo"] = serde_json::json!("{\"forward\":{}}");
    packet.data = serde_json::to_vec(&data).expect("data should encode");

    limiter.on_send(&ctx(1_000), &packet).expect("memo is not accounted");
    assert_eq!(outflow(&limiter), Amount::from(10u64));
}

#[test]
fn given_quota_window_shortened_when_next_transfer_rolls_then_window_restarts_once() {
    let store = native_quota_store(10, 1_000);
    let mut limiter = RateLimiter::new(store.clone());
    limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "100"))
        .expect("first window filled");

    store
        .set_quota(
            QuotaScope::path(LOCAL_CHANNEL, NATIVE_DENOM),
            QuotaConfig::new(10, 10, 60).expect("quota should be valid"),
        )
        .expect("quota should be replaced");

    limiter
        .on_send(&ctx(8_000), &send_packet(2, NATIVE_DENOM, "100"))
        .expect("expired window rolls into the short one");
    let state = limiter
        .flow(LOCAL_CHANNEL, NATIVE_DENOM)
        .expect("flow should be tracked");
    assert_eq!(state.window_start, 8_000);
    assert_eq!(state.window_duration_secs, 60);

    let err = limiter
        .on_send(&ctx(8_001), &send_packet(3, NATIVE_DENOM, "100"))
        .expect_err("the short window is already full");
    assert_eq!(err.kind, RateLimitErrorKind::QuotaExceeded);
    assert_eq!(outflow(&limiter), Amount::from(100u64));
}
