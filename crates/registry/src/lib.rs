// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Process registry (spec.md §4.4): liveness tracking for cooperating
//! processes, plus the two sibling coordination services that consume it.

pub mod consensus;
pub mod expiration;
pub mod registry;
pub mod work_stealing;

pub use consensus::{ConsensusGate, Decision, Proposal, Vote, VotingMode};
pub use expiration::{spawn as spawn_expiration, ExpirationHandle, DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_TICK_INTERVAL};
pub use registry::{ListFilter, ProcessRegistry, RegisterInput, UpdatePatch};
pub use work_stealing::{RebalanceMetrics, WorkStealingTracker, Workload};
