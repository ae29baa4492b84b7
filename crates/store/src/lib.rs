// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Reactive session state store (spec.md §4.5): a consistent, ordered,
//! in-memory projection of server-originated session events.

pub mod store;

pub use relay_core::Message;
pub use store::{BootstrapSnapshot, DeepSyncData, SessionStore, MESSAGE_WINDOW_CAP};
