use std::{fs, path::PathBuf};

use ibc_ratelimit::{
    RateLimitErrorKind, RateLimiter, Resolution, config::LedgerRuntimeConfig,
    persistence::LedgerPersistence, types::Amount,
};
use uuid::Uuid;

use crate::support::{
    LOCAL_CHANNEL, NATIVE_DENOM, ctx, error_ack, native_quota_store, outflow, send_packet,
};

fn work_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ratelimit-persistence-test-{}", Uuid::now_v7()));
    fs::create_dir_all(&dir).expect("temp work dir should be created");
    dir
}

#[test]
fn given_persisted_limiter_when_restarted_then_flows_and_pending_sends_survive() {
    let dir = work_dir();
    let state_path = dir.join("state/ledger.json");
    let packet = send_packet(1, NATIVE_DENOM, "100");

    {
        let mut limiter = RateLimiter::with_persistence(
            native_quota_store(10, 1_000),
            LedgerPersistence::new(state_path.clone()),
        )
        .expect("fresh limiter should start");
        limiter.on_send(&ctx(1_000), &packet).expect("send admitted");
    }
    assert!(state_path.exists(), "ledger should be flushed on commit");

    let mut restarted = RateLimiter::with_persistence(
        native_quota_store(10, 1_000),
        LedgerPersistence::new(state_path.clone()),
    )
    .expect("restarted limiter should load state");
    assert_eq!(outflow(&restarted), Amount::from(100u64));
    let pending = restarted
        .pending_send(LOCAL_CHANNEL, 1)
        .expect("pending send should survive restart");
    assert_eq!(pending.registered_at, 1_000);

    let resolution = restarted
        .on_acknowledge(&ctx(1_100), &packet, &error_ack("failed"))
        .expect("ack should resolve after restart");
    assert!(matches!(resolution, Resolution::Reversed { .. }));

    let reloaded = LedgerPersistence::new(state_path)
        .load()
        .expect("state should be readable")
        .expect("state should exist");
    assert_eq!(&reloaded, restarted.ledger());
    assert!(reloaded.pending_sends().is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_missing_state_file_when_loading_then_ledger_starts_empty() {
    let dir = work_dir();
    let persistence = LedgerPersistence::new(dir.join("absent.json"));

    assert!(persistence.load().expect("missing file is not an error").is_none());
    let limiter = RateLimiter::with_persistence(native_quota_store(10, 1_000), persistence)
        .expect("limiter should start empty");
    assert_eq!(limiter.ledger().flows().count(), 0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_unknown_state_version_when_loading_then_startup_fails() {
    let dir = work_dir();
    let state_path = dir.join("ledger.json");
    fs::write(&state_path, r#"{"version": 99, "flows": [], "pending_sends": []}"#)
        .expect("state should be written");

    let err = RateLimiter::with_persistence(
        native_quota_store(10, 1_000),
        LedgerPersistence::new(state_path),
    )
    .err()
    .expect("unsupported version must be refused");
    assert_eq!(err.kind, RateLimitErrorKind::Internal);
    assert!(err.message.contains("version 99"), "unexpected error: {err}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_unwritable_state_path_when_flush_fails_then_mutation_is_rolled_back() {
    let dir = work_dir();
    fs::create_dir_all(dir.join("ledger.tmp")).expect("temp path should be blocked");

    let mut limiter = RateLimiter::with_persistence(
        native_quota_store(10, 1_000),
        LedgerPersistence::new(dir.join("ledger.json")),
    )
    .expect("missing state loads as empty");

    let err = limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "100"))
        .expect_err("flush failure must surface");
    assert_eq!(err.kind, RateLimitErrorKind::Internal);
    assert!(limiter.flow(LOCAL_CHANNEL, NATIVE_DENOM).is_none());
    assert!(limiter.pending_send(LOCAL_CHANNEL, 1).is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_persistence_disabled_in_config_when_sending_then_no_state_file_is_written() {
    let dir = work_dir();
    let state_path = dir.join("ledger.json");
    let config = LedgerRuntimeConfig {
        state_path: state_path.clone(),
        persist: false,
    };

    let mut limiter = RateLimiter::from_config(&config, native_quota_store(10, 1_000))
        .expect("in-memory limiter should start");
    limiter
        .on_send(&ctx(1_000), &send_packet(1, NATIVE_DENOM, "10"))
        .expect("send admitted");
    assert!(!state_path.exists());

    let _ = fs::remove_dir_all(&dir);
}
