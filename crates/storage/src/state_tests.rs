// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relay_core::{MessageId, MessageRole, PartId, PartKind, SessionId};

fn sample_session(id: &str) -> Session {
    Session {
        id: SessionId::new(id),
        slug: id.to_string(),
        title: format!("session {id}"),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        archived_at: None,
        directory: "/tmp".to_string(),
        parent_id: None,
        share: None,
    }
}

fn sample_message(session_id: &str, msg_id: &str) -> Message {
    Message {
        id: MessageId::new(msg_id),
        session_id: SessionId::new(session_id),
        role: MessageRole::User,
        created_at: Utc::now(),
        completed_at: None,
        provider_id: None,
        model_id: None,
    }
}

#[test]
fn session_create_then_update_reconciles_whole_record() {
    let mut state = MaterializedState::new();
    let mut session = sample_session("s1");
    state.apply_op(&WalOp::SessionCreate {
        session: session.clone(),
    });

    session.title = "renamed".to_string();
    state.apply_op(&WalOp::SessionUpdate {
        session: session.clone(),
    });

    assert_eq!(
        state.get_session(&SessionId::new("s1")).unwrap().title,
        "renamed"
    );
    assert_eq!(state.sessions.len(), 1);
}

#[test]
fn applying_session_create_twice_is_idempotent() {
    let mut state = MaterializedState::new();
    let session = sample_session("s1");
    state.apply_op(&WalOp::SessionCreate {
        session: session.clone(),
    });
    state.apply_op(&WalOp::SessionCreate { session });
    assert_eq!(state.sessions.len(), 1);
}

#[test]
fn message_window_evicts_oldest_and_cascades_part_removal() {
    let mut state = MaterializedState::new();
    let session_id = SessionId::new("s1");

    for i in 0..MESSAGE_WINDOW_CAP {
        let msg = sample_message("s1", &format!("m{i:04}"));
        state.apply_op(&WalOp::MessageCreate { message: msg.clone() });
        state
            .parts
            .insert(msg.id.clone(), vec![Part {
                id: PartId::new(format!("p{i}")),
                message_id: msg.id.clone(),
                kind: PartKind::Text,
                tool_state: None,
                metadata: Default::default(),
            }]);
    }
    assert_eq!(state.messages_for(&session_id).len(), MESSAGE_WINDOW_CAP);

    let overflow_msg = sample_message("s1", "m-overflow");
    state.apply_op(&WalOp::MessageCreate {
        message: overflow_msg,
    });

    assert_eq!(state.messages_for(&session_id).len(), MESSAGE_WINDOW_CAP);
    let oldest_id = MessageId::new("m0000");
    assert!(state.parts.get(&oldest_id).is_none());
    assert!(state
        .messages_for(&session_id)
        .iter()
        .all(|m| m.id != oldest_id));
}

#[test]
fn session_activate_records_last_active_timestamp() {
    let mut state = MaterializedState::new();
    let session_id = SessionId::new("s1");
    assert!(state.last_active_for(&session_id).is_none());

    state.apply_op(&WalOp::SessionActivate {
        session_id: session_id.clone(),
    });

    assert!(state.last_active_for(&session_id).is_some());
}

#[test]
fn todo_update_upserts_each_todo_by_key() {
    use relay_core::{Todo, TodoId, TodoStatus};

    let mut state = MaterializedState::new();
    let session_id = SessionId::new("s1");
    let todos = vec![
        Todo {
            id: TodoId::new("t1"),
            session_id: session_id.clone(),
            status: TodoStatus::Pending,
        },
        Todo {
            id: TodoId::new("t2"),
            session_id: session_id.clone(),
            status: TodoStatus::InProgress,
        },
    ];
    state.apply_op(&WalOp::TodoUpdate {
        session_id: session_id.clone(),
        todos,
    });

    assert_eq!(state.todos_for(&session_id).len(), 2);

    state.apply_op(&WalOp::TodoUpdate {
        session_id: session_id.clone(),
        todos: vec![Todo {
            id: TodoId::new("t1"),
            session_id: session_id.clone(),
            status: TodoStatus::Completed,
        }],
    });

    assert_eq!(state.todos_for(&session_id).len(), 2);
    let t1 = state
        .todos_for(&session_id)
        .iter()
        .find(|t| t.id.as_str() == "t1")
        .unwrap();
    assert_eq!(t1.status, TodoStatus::Completed);
}

#[test]
fn purge_stale_activity_drops_entries_past_retention() {
    let mut state = MaterializedState::new();
    let old_session = SessionId::new("old");
    let fresh_session = SessionId::new("fresh");
    state
        .last_active
        .insert(old_session.clone(), Utc::now() - chrono::Duration::days(40));
    state.last_active.insert(fresh_session.clone(), Utc::now());

    state.purge_stale_activity(30);

    assert!(state.last_active_for(&old_session).is_none());
    assert!(state.last_active_for(&fresh_session).is_some());
}
