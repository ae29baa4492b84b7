// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spec.md §8 end-to-end scenario 6: process offline transition. The
//! expiration ticker itself is unit-tested in
//! `relay-registry`'s `expiration_tests.rs`; this drives it through a
//! real daemon process with the thresholds shrunk via spec.md §6.4's
//! env overrides so the test doesn't wait 30+ seconds.

use crate::prelude::*;
use relay_core::{ProcessStatus, ProcessType};
use relay_daemon::{Request, Response};
use std::collections::HashMap;
use std::time::Duration;

#[test]
fn a_process_without_a_heartbeat_is_marked_offline_then_revived() {
    let daemon = Daemon::start_with_envs(&[
        ("HEARTBEAT_TIMEOUT_MS", "50"),
        ("HEARTBEAT_CHECK_INTERVAL_MS", "20"),
    ]);
    let mut client = daemon.connect();

    let response = client.call(&Request::ProcessRegister {
        id: None,
        process_type: ProcessType::Worker,
        name: "flaky-worker".to_string(),
        parent_id: None,
        swarm_id: None,
        capabilities: vec![],
        metadata: HashMap::new(),
        host: None,
    });
    let Response::Process { process: Some(process) } = response else {
        panic!("expected a registered process, got {response:?}");
    };
    assert_eq!(process.status, ProcessStatus::Active);

    let went_offline = wait_for(Duration::from_secs(2), || {
        let response = client.call(&Request::ProcessGet { id: process.id.clone() });
        matches!(
            response,
            Response::Process {
                process: Some(ref p)
            } if p.status == ProcessStatus::Offline
        )
    });
    assert!(went_offline, "process was never marked offline");

    let response = client.call(&Request::ProcessHeartbeat { id: process.id.clone() });
    let Response::Process { process: Some(revived) } = response else {
        panic!("expected the heartbeat to revive the process, got {response:?}");
    };
    assert_eq!(revived.status, ProcessStatus::Active);

    daemon.shutdown();
}
