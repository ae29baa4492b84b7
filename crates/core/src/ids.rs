// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes for every entity in the data model (spec.md §3).

crate::define_id! {
    /// Unique identifier for a session. Sortable: session ids are
    /// monotonically increasing strings, so lexical order is insertion order.
    pub struct SessionId;
}

crate::define_id! {
    /// Unique identifier for a message within a session. Monotonically
    /// sortable, total order within the owning session.
    pub struct MessageId;
}

crate::define_id! {
    /// Unique identifier for a part within a message. Monotonically
    /// sortable, total order within the owning message.
    pub struct PartId;
}

crate::define_id! {
    /// Unique identifier for a todo within a session.
    pub struct TodoId;
}

crate::define_id! {
    /// Unique identifier for a cooperating process (agent/swarm/worker/
    /// daemon/queen). Distinct from OS process ids.
    pub struct ProcessId;
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
