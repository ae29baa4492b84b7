// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatch: maps each [`Request`] to the subsystem it targets
//! and produces a [`Response`].
//!
//! Grounded on the teacher's `daemon/src/listener/` dispatch table (one
//! match arm per request variant, each arm a thin call into a subsystem
//! handle already owned by `DaemonState`); condensed here into a single
//! module since the new surface is far smaller than the teacher's
//! job/cron/runbook one.

use crate::lifecycle::DaemonState;
use crate::protocol::{ProcessEntry, ProcessStats, Request, Response, StatusSnapshot};
use relay_core::{DailySessionRecord, Event, IdGen, MessageId, Process, ProcessId, SessionId, UuidIdGen};
use relay_registry::{ListFilter, RegisterInput, UpdatePatch};
use relay_storage::SessionContext;
use std::cell::Cell;
use std::collections::HashMap;

fn parse_process_id(id: &str) -> ProcessId {
    ProcessId::new(id.to_string())
}

fn parse_session_id(id: &str) -> SessionId {
    SessionId::new(id.to_string())
}

fn parse_message_id(id: &str) -> MessageId {
    MessageId::new(id.to_string())
}

pub async fn dispatch(state: &DaemonState, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Hello { .. } => Response::Hello {
            version: crate::protocol_wire::PROTOCOL_VERSION.to_string(),
        },
        Request::Status => Response::Status {
            status: StatusSnapshot {
                uptime_secs: state.started_at.elapsed().as_secs(),
                recovered: state.recovered,
                replayed_entries: state.replayed_entries,
                wal_write_seq: state.wal.lock().write_seq(),
                wal_processed_seq: state.wal.lock().processed_seq(),
                session_count: state.session_store.sessions().len(),
                process_count: state.process_registry.list(&ListFilter::default()).len(),
            },
        },
        Request::Shutdown => Response::ShuttingDown,

        Request::PublishEvent { event } => {
            state.bus.publish(event);
            Response::Ok
        }

        Request::ProcessRegister {
            id,
            process_type,
            name,
            parent_id,
            swarm_id,
            capabilities,
            metadata,
            host,
        } => {
            let mut input = RegisterInput::new(process_type, name);
            input.id = id.map(|s| parse_process_id(&s));
            input.parent_id = parent_id.map(|s| parse_process_id(&s));
            input.swarm_id = swarm_id;
            input.capabilities = capabilities;
            input.metadata = metadata;
            input.host = host;
            let process = state.process_registry.register(input, chrono::Utc::now());
            Response::Process {
                process: Some(process.into()),
            }
        }
        Request::ProcessDeregister { id } => {
            let found = state.process_registry.deregister(&parse_process_id(&id));
            Response::Deregistered { found }
        }
        Request::ProcessHeartbeat { id } => {
            let process = state
                .process_registry
                .heartbeat(&parse_process_id(&id), chrono::Utc::now());
            Response::Process {
                process: process.map(ProcessEntry::from),
            }
        }
        Request::ProcessUpdate {
            id,
            status,
            capabilities,
            metadata,
        } => {
            let patch = UpdatePatch {
                status,
                capabilities,
                metadata,
            };
            let process = state
                .process_registry
                .update(&parse_process_id(&id), patch, chrono::Utc::now());
            Response::Process {
                process: process.map(ProcessEntry::from),
            }
        }
        Request::ProcessGet { id } => Response::Process {
            process: state.process_registry.get(&parse_process_id(&id)).map(ProcessEntry::from),
        },
        Request::ProcessList {
            process_type,
            swarm_id,
            status,
            parent_id,
            capabilities,
        } => {
            let filter = ListFilter {
                process_type,
                swarm_id,
                status,
                parent_id: parent_id.map(|s| parse_process_id(&s)),
                capabilities,
            };
            let processes = state.process_registry.list(&filter).into_iter().map(ProcessEntry::from).collect();
            Response::Processes { processes }
        }
        Request::ProcessGetBySwarm { swarm_id } => Response::Processes {
            processes: state
                .process_registry
                .get_by_swarm(&swarm_id)
                .into_iter()
                .map(ProcessEntry::from)
                .collect(),
        },
        Request::ProcessGetSwarms => Response::Swarms {
            swarms: state.process_registry.get_swarms(),
        },
        Request::ProcessFindAvailable { capabilities } => Response::Processes {
            processes: state
                .process_registry
                .find_available(&capabilities)
                .into_iter()
                .map(ProcessEntry::from)
                .collect(),
        },
        Request::ProcessStats => Response::Stats {
            stats: process_stats(&state.process_registry.list(&ListFilter::default())),
        },

        Request::GetOrCreateDailySession { persona, date } => {
            let is_new = Cell::new(false);
            let record = match state
                .daily_sessions
                .get_or_create(&persona, date, || {
                    is_new.set(true);
                    DailySessionRecord {
                        session_id: SessionId::new(UuidIdGen.next()),
                        chat_id: None,
                        created_at: chrono::Utc::now(),
                    }
                })
                .await
            {
                Ok(record) => record,
                Err(error) => return Response::Error { message: error.to_string() },
            };

            // No bus Event carries "this session was just used today"; it is
            // a daemon-internal fact, so it is written straight to the WAL
            // and materialized state rather than routed through a publish.
            let op = relay_core::WalOp::SessionActivate {
                session_id: record.session_id.clone(),
            };
            {
                let mut wal = state.wal.lock();
                let mut materialized = state.state.lock();
                materialized.apply_op(&op);
                if let Err(error) = wal.append(&op) {
                    tracing::warn!(%error, "failed to buffer session-activate WAL entry");
                }
            }

            Response::DailySession {
                session_id: record.session_id.as_str().to_string(),
                is_new: is_new.get(),
            }
        }

        Request::StreamRecordActivity {
            session_id,
            message_id,
            phase,
            kind,
            bytes,
        } => {
            let session_id = parse_session_id(&session_id);
            let message_id = parse_message_id(&message_id);
            let now = chrono::Utc::now();
            let key = state.stream_registry.get_or_create(session_id, message_id, now);
            state.stream_registry.with_monitor(&key, |monitor| {
                monitor.record_activity(phase, kind, bytes, now);
            });
            Response::Ok
        }
        Request::StreamComplete { session_id, message_id } => {
            let key = (parse_session_id(&session_id), parse_message_id(&message_id));
            let now = chrono::Utc::now();
            let report = state.stream_registry.with_monitor(&key, |monitor| {
                monitor.complete(now);
                monitor.report()
            });
            state.stream_registry.clear(&key);
            if let Some(report) = report {
                state.bus.publish(Event::StreamCompleted { report });
            }
            Response::Ok
        }
        Request::StreamFail { session_id, message_id, error } => {
            let key = (parse_session_id(&session_id), parse_message_id(&message_id));
            let now = chrono::Utc::now();
            let report = state.stream_registry.with_monitor(&key, |monitor| {
                monitor.fail(error, now);
                monitor.report()
            });
            state.stream_registry.clear(&key);
            if let Some(report) = report {
                state.bus.publish(Event::StreamFailed { report });
            }
            Response::Ok
        }
        Request::StreamGetState { session_id, message_id } => {
            let key = (parse_session_id(&session_id), parse_message_id(&message_id));
            let snapshot = state
                .stream_registry
                .with_monitor(&key, |monitor| (monitor.state(), monitor.phase(), monitor.report()));
            Response::StreamState {
                state: snapshot.as_ref().map(|(s, _, _)| *s),
                phase: snapshot.as_ref().map(|(_, p, _)| *p),
                report: snapshot.map(|(_, _, r)| r),
            }
        }

        Request::SessionsList => Response::Sessions {
            sessions: state.session_store.sessions(),
        },
        Request::SessionMessages { session_id } => Response::Messages {
            messages: state.session_store.messages(&parse_session_id(&session_id)),
        },
        Request::SessionTodos { session_id } => Response::Todos {
            todos: state.session_store.todos(&parse_session_id(&session_id)),
        },

        Request::GetModel => Response::Model {
            value: state.model_store.get(),
        },
        Request::SetModel { value } => match state.model_store.set(value) {
            Ok(()) => Response::Ok,
            Err(error) => Response::Error { message: error.to_string() },
        },
        Request::GetMode => Response::Mode {
            hold: state.mode_store.get().hold,
        },
        Request::SetMode { hold } => {
            match state.mode_store.set(relay_storage::ModeState { hold }) {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        Request::GetParams { session_id } => Response::Params {
            value: state.params_store.get(&session_id),
        },
        Request::SetParams { session_id, value } => match state.params_store.set(&session_id, value) {
            Ok(()) => Response::Ok,
            Err(error) => Response::Error { message: error.to_string() },
        },
        Request::GetSessionContext { session_id } => match state.session_contexts.get(&session_id) {
            Some(context) => Response::SessionContext {
                timestamp: Some(context.timestamp),
                memories: context.memories,
            },
            None => Response::SessionContext {
                timestamp: None,
                memories: Vec::new(),
            },
        },
        Request::SetSessionContext { session_id, memories } => {
            let context = SessionContext {
                timestamp: chrono::Utc::now(),
                memories,
            };
            match state.session_contexts.set(&session_id, context) {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
    }
}

fn process_stats(processes: &[Process]) -> ProcessStats {
    let mut by_type: HashMap<String, usize> = HashMap::new();
    let mut by_status: HashMap<String, usize> = HashMap::new();
    let mut swarms = std::collections::HashSet::new();
    let mut active_agent_count = 0;

    for process in processes {
        *by_type.entry(format!("{:?}", process.process_type)).or_insert(0) += 1;
        *by_status.entry(format!("{:?}", process.status)).or_insert(0) += 1;
        if let Some(swarm_id) = &process.swarm_id {
            swarms.insert(swarm_id.clone());
        }
        if process.process_type == relay_core::ProcessType::Agent
            && process.status == relay_core::ProcessStatus::Active
        {
            active_agent_count += 1;
        }
    }

    ProcessStats {
        total: processes.len(),
        by_type,
        by_status,
        swarm_count: swarms.len(),
        active_agent_count,
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
