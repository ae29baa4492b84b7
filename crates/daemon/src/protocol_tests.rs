// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn request_round_trips_through_json() {
    let req = Request::ProcessHeartbeat {
        id: "proc_1".to_string(),
    };
    let encoded = serde_json::to_string(&req).expect("encode");
    let decoded: Request = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(req, decoded);
}

#[test]
fn request_tag_matches_variant_name() {
    let encoded = serde_json::to_value(Request::Ping).expect("encode");
    assert_eq!(encoded["type"], "Ping");
}

#[test]
fn response_round_trips_through_json() {
    let resp = Response::DailySession {
        session_id: "ses_1".to_string(),
        is_new: true,
    };
    let encoded = serde_json::to_string(&resp).expect("encode");
    let decoded: Response = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(resp, decoded);
}

#[test]
fn stream_record_activity_round_trips_through_json() {
    let req = Request::StreamRecordActivity {
        session_id: "ses_1".to_string(),
        message_id: "msg_1".to_string(),
        phase: StreamPhase::Generating,
        kind: ActivityKind::TextDelta,
        bytes: 7,
    };
    let encoded = serde_json::to_string(&req).expect("encode");
    let decoded: Request = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(req, decoded);
}

#[test]
fn process_entry_converts_from_core_process() {
    let process = relay_core::Process {
        id: relay_core::ProcessId::new("proc_1"),
        process_type: ProcessType::Agent,
        name: "worker".to_string(),
        parent_id: None,
        swarm_id: None,
        capabilities: vec!["codegen".to_string()],
        status: ProcessStatus::Active,
        metadata: HashMap::new(),
        last_heartbeat: chrono::Utc::now(),
        registered_at: chrono::Utc::now(),
        host: None,
    };
    let entry: ProcessEntry = process.into();
    assert_eq!(entry.id, "proc_1");
    assert_eq!(entry.name, "worker");
}
