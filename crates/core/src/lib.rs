// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-core: shared identifiers, entities, and event definitions for
//! the session coordination daemon.

pub mod clock;
pub mod entities;
pub mod event;
pub mod id;
pub mod ids;
pub mod ordered;
pub mod stream_health;
pub mod time_fmt;

pub use clock::{Clock, FakeClock, SystemClock};
pub use entities::{
    DailySessionRecord, Message, MessageRole, Part, PartKind, Permission, Process, ProcessStatus,
    ProcessType, Question, Session, SessionStatus, ShareDescriptor, Todo, TodoStatus,
    ToolInvocationState,
};
pub use event::{Event, WalOp};
pub use id::{IdGen, ShortId, UuidIdGen};
pub use ids::{MessageId, PartId, ProcessId, SessionId, TodoId};
pub use ordered::{Keyed, OrderedSeq};
pub use stream_health::{ActivityKind, StreamHealthReport, StreamState};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
