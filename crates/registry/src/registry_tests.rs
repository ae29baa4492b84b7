// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relay_bus::EventBus;
use relay_core::ProcessType;

fn registry() -> ProcessRegistry {
    ProcessRegistry::new(EventBus::new())
}

#[test]
fn register_generates_an_id_when_none_given() {
    let registry = registry();
    let process = registry.register(RegisterInput::new(ProcessType::Worker, "w1"), Utc::now());
    assert!(!process.id.as_str().is_empty());
    assert_eq!(process.status, ProcessStatus::Active);
}

#[test]
fn register_with_existing_id_folds_into_update() {
    let registry = registry();
    let id = ProcessId::new("proc_1");
    let mut input = RegisterInput::new(ProcessType::Agent, "a1");
    input.id = Some(id.clone());
    input.capabilities = vec!["code".to_string()];
    registry.register(input.clone(), Utc::now());

    let mut second = input;
    second.capabilities = vec!["code".to_string(), "review".to_string()];
    let updated = registry.register(second, Utc::now());

    assert_eq!(updated.id, id);
    assert_eq!(updated.capabilities, vec!["code", "review"]);
    assert_eq!(registry.list(&ListFilter::default()).len(), 1);
}

#[test]
fn deregister_removes_and_reports_presence() {
    let registry = registry();
    let process = registry.register(RegisterInput::new(ProcessType::Worker, "w1"), Utc::now());
    assert!(registry.deregister(&process.id));
    assert!(!registry.deregister(&process.id));
    assert!(registry.get(&process.id).is_none());
}

#[test]
fn heartbeat_on_offline_process_transitions_back_to_active() {
    let registry = registry();
    let process = registry.register(RegisterInput::new(ProcessType::Worker, "w1"), Utc::now());
    registry.update(
        &process.id,
        UpdatePatch {
            status: Some(ProcessStatus::Offline),
            capabilities: None,
            metadata: None,
        },
        Utc::now(),
    );

    let refreshed = registry.heartbeat(&process.id, Utc::now()).unwrap();
    assert_eq!(refreshed.status, ProcessStatus::Active);
}

#[test]
fn heartbeat_on_unknown_process_returns_none() {
    let registry = registry();
    assert!(registry.heartbeat(&ProcessId::new("missing"), Utc::now()).is_none());
}

#[test]
fn list_filters_conjunctively() {
    let registry = registry();
    let mut a = RegisterInput::new(ProcessType::Worker, "a");
    a.swarm_id = Some("swarm-1".to_string());
    a.capabilities = vec!["code".to_string()];
    let a = registry.register(a, Utc::now());

    let mut b = RegisterInput::new(ProcessType::Worker, "b");
    b.swarm_id = Some("swarm-2".to_string());
    b.capabilities = vec!["code".to_string()];
    registry.register(b, Utc::now());

    let filter = ListFilter {
        swarm_id: Some("swarm-1".to_string()),
        capabilities: vec!["code".to_string()],
        ..Default::default()
    };
    let results = registry.list(&filter);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, a.id);
}

#[test]
fn find_available_excludes_offline_and_missing_capabilities() {
    let registry = registry();
    let mut worker = RegisterInput::new(ProcessType::Worker, "w");
    worker.capabilities = vec!["gpu".to_string()];
    let worker = registry.register(worker, Utc::now());

    let mut idle_worker = RegisterInput::new(ProcessType::Worker, "w2");
    idle_worker.capabilities = vec!["cpu".to_string()];
    registry.register(idle_worker, Utc::now());

    assert_eq!(registry.find_available(&["gpu".to_string()]).len(), 1);

    registry.update(
        &worker.id,
        UpdatePatch {
            status: Some(ProcessStatus::Offline),
            capabilities: None,
            metadata: None,
        },
        Utc::now(),
    );
    assert_eq!(registry.find_available(&["gpu".to_string()]).len(), 0);
}

#[test]
fn get_swarms_lists_distinct_sorted_swarm_ids() {
    let registry = registry();
    let mut a = RegisterInput::new(ProcessType::Worker, "a");
    a.swarm_id = Some("zz".to_string());
    registry.register(a, Utc::now());
    let mut b = RegisterInput::new(ProcessType::Worker, "b");
    b.swarm_id = Some("aa".to_string());
    registry.register(b, Utc::now());
    let mut c = RegisterInput::new(ProcessType::Worker, "c");
    c.swarm_id = Some("aa".to_string());
    registry.register(c, Utc::now());

    assert_eq!(registry.get_swarms(), vec!["aa".to_string(), "zz".to_string()]);
}

#[test]
fn expire_stale_marks_offline_past_timeout_only() {
    let registry = registry();
    let t0 = Utc::now();
    let process = registry.register(RegisterInput::new(ProcessType::Worker, "w"), t0);

    let expired = registry.expire_stale(t0 + chrono::Duration::seconds(10), chrono::Duration::seconds(30));
    assert!(expired.is_empty());
    assert_eq!(registry.get(&process.id).unwrap().status, ProcessStatus::Active);

    let expired = registry.expire_stale(t0 + chrono::Duration::seconds(31), chrono::Duration::seconds(30));
    assert_eq!(expired.len(), 1);
    assert_eq!(registry.get(&process.id).unwrap().status, ProcessStatus::Offline);
}
