// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use relay_daemon::{Request, Response};
use std::collections::HashMap;

#[test]
fn ping_and_hello_work_over_a_real_socket() {
    let daemon = Daemon::start();
    let mut client = daemon.connect();

    assert_eq!(client.call(&Request::Ping), Response::Pong);
    assert_eq!(
        client.call(&Request::Hello { version: "test".to_string() }),
        Response::Hello {
            version: relay_daemon::PROTOCOL_VERSION.to_string(),
        }
    );

    daemon.shutdown();
}

#[test]
fn process_register_survives_a_round_trip_then_shutdown_is_graceful() {
    let daemon = Daemon::start();
    let mut client = daemon.connect();

    let response = client.call(&Request::ProcessRegister {
        id: None,
        process_type: relay_core::ProcessType::Worker,
        name: "integration-worker".to_string(),
        parent_id: None,
        swarm_id: None,
        capabilities: vec!["build".to_string()],
        metadata: HashMap::new(),
        host: None,
    });
    let Response::Process { process: Some(process) } = response else {
        panic!("expected a registered process, got {response:?}");
    };
    assert_eq!(process.name, "integration-worker");

    let response = client.call(&Request::ProcessGet { id: process.id.clone() });
    assert_eq!(response, Response::Process { process: Some(process) });

    daemon.shutdown();
}

#[test]
fn a_second_daemon_over_the_same_state_dir_is_refused() {
    let daemon = Daemon::start();
    let state_dir = daemon.state_dir().to_path_buf();

    // relayd exits non-zero rather than blocking forever when the lock is
    // already held.
    let output = std::process::Command::new(relayd_binary_path())
        .env("RELAY_STATE_DIR", &state_dir)
        .output()
        .expect("second relayd should run and exit");
    assert!(!output.status.success());

    daemon.shutdown();
}
