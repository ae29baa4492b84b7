// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spec.md §8 end-to-end scenario 1: crash-consistency across WAL +
//! checkpoint. Exercises the real binary, since per-crate unit tests
//! (`relay-storage`'s `recovery_tests.rs`) already cover the pure
//! replay logic in isolation but never a real process dying mid-flight.

use crate::prelude::*;
use relay_core::{Event, Session, SessionId};
use relay_daemon::{Request, Response};

fn sample_session(id: &str) -> Session {
    let now = chrono::Utc::now();
    Session {
        id: SessionId::new(id),
        slug: id.to_string(),
        title: "crash-recovery spec".to_string(),
        created_at: now,
        updated_at: now,
        archived_at: None,
        directory: "/tmp/crash-recovery".to_string(),
        parent_id: None,
        share: None,
    }
}

#[test]
fn a_session_published_before_a_kill_is_recovered_on_restart() {
    let mut daemon = Daemon::start();
    let mut client = daemon.connect();

    let session = sample_session("s1");
    let response = client.call(&Request::PublishEvent {
        event: Event::SessionCreated { session: session.clone() },
    });
    assert_eq!(response, Response::Ok);

    // Give the bus's coalescing window time to deliver before the kill.
    std::thread::sleep(std::time::Duration::from_millis(100));

    // Simulate a crash: no Shutdown request, no clean unwind. The
    // recovery marker written at startup is still on disk afterward.
    daemon.kill();
    let state_dir = daemon.into_state_dir();
    assert!(relay_storage::needs_recovery(state_dir.path()));

    let daemon = Daemon::start_in(state_dir, &[]);
    let mut client = daemon.connect();

    let response = client.call(&Request::SessionsList);
    let Response::Sessions { sessions } = response else {
        panic!("expected a session list, got {response:?}");
    };
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session.id);

    // Recovery clears the marker on a subsequent clean shutdown.
    daemon.shutdown();
}
