// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn test_config(dir: &tempfile::TempDir) -> Config {
    std::env::set_var("RELAY_STATE_DIR", dir.path());
    Config::load().expect("config")
}

#[tokio::test]
#[serial_test::serial]
async fn startup_with_no_prior_state_starts_clean() {
    let dir = tempdir().expect("tempdir");
    let config = test_config(&dir);
    let state = DaemonState::startup(config).await.expect("startup");
    assert!(!state.recovered);
    assert_eq!(state.replayed_entries, 0);
    state.shutdown().await.expect("shutdown");
}

#[tokio::test]
#[serial_test::serial]
async fn clean_shutdown_removes_the_recovery_marker() {
    let dir = tempdir().expect("tempdir");
    let config = test_config(&dir);
    let state_dir = config.state_dir.clone();
    let state = DaemonState::startup(config).await.expect("startup");

    assert!(relay_storage::needs_recovery(&state_dir));
    state.shutdown().await.expect("shutdown");
    assert!(!relay_storage::needs_recovery(&state_dir));
}

#[tokio::test]
#[serial_test::serial]
async fn a_published_session_event_lands_in_the_session_store_and_the_wal() {
    let dir = tempdir().expect("tempdir");
    let config = test_config(&dir);
    let state = DaemonState::startup(config).await.expect("startup");

    let session = relay_core::Session {
        id: relay_core::SessionId::new("ses_1"),
        slug: "test".to_string(),
        title: "Test".to_string(),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
        archived_at: None,
        directory: "/tmp/test".to_string(),
        parent_id: None,
        share: None,
    };
    state.bus.publish(Event::SessionCreated { session: session.clone() });

    // The bus coalesces delivery over a short window; give the runtime a
    // chance to drain it before asserting.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(state.session_store.sessions().len(), 1);
    assert_eq!(state.wal.lock().write_seq(), 1);

    state.shutdown().await.expect("shutdown");
}

#[tokio::test]
#[serial_test::serial]
async fn a_second_startup_holding_the_lock_fails() {
    let dir = tempdir().expect("tempdir");
    let config = test_config(&dir);
    let state = DaemonState::startup(config).await.expect("startup");

    let second_config = test_config(&dir);
    let err = DaemonState::startup(second_config).await.unwrap_err();
    assert!(matches!(err, LifecycleError::LockHeld(_)));

    state.shutdown().await.expect("shutdown");
}
