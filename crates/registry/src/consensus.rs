// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consensus gate (spec.md §4.4.4): "policy, not hard engineering" per
//! spec — implemented with reasonable, swappable defaults rather than
//! grounded on a specific teacher file.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_core::ProcessId;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotingMode {
    /// No voters registered, or a single authoritative proposer: decide
    /// immediately without a voting round.
    AutoDecision,
    /// Require `threshold` fraction of registered voters to approve.
    Quorum { threshold_numerator: u32, threshold_denominator: u32 },
}

#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: String,
    pub proposal_type: String,
    pub description: String,
    pub content: serde_json::Value,
    pub proposer: ProcessId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved { reason: String },
    Rejected { reason: String },
    Pending,
}

struct ProposalState {
    proposal: Proposal,
    mode: VotingMode,
    voters: Vec<ProcessId>,
    votes: HashMap<ProcessId, Vote>,
    decision: Decision,
}

pub struct ConsensusGate {
    proposals: Mutex<HashMap<String, ProposalState>>,
}

impl Default for ConsensusGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsensusGate {
    pub fn new() -> Self {
        Self {
            proposals: Mutex::new(HashMap::new()),
        }
    }

    /// Submit a proposal for a vote distributed across `voters`. An
    /// empty voter list resolves immediately under `AutoDecision`.
    pub fn submit(
        &self,
        proposal_type: impl Into<String>,
        description: impl Into<String>,
        content: serde_json::Value,
        proposer: ProcessId,
        voters: Vec<ProcessId>,
        mode: VotingMode,
        now: DateTime<Utc>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let proposal = Proposal {
            id: id.clone(),
            proposal_type: proposal_type.into(),
            description: description.into(),
            content,
            proposer,
            created_at: now,
        };

        let decision = if voters.is_empty() || mode == VotingMode::AutoDecision {
            Decision::Approved {
                reason: "auto-decided: no quorum required".to_string(),
            }
        } else {
            Decision::Pending
        };

        self.proposals.lock().insert(
            id.clone(),
            ProposalState {
                proposal,
                mode,
                voters,
                votes: HashMap::new(),
                decision,
            },
        );
        id
    }

    /// Record a vote from `voter`. Re-evaluates the decision under quorum
    /// mode once all voters have responded, or as soon as an outcome is
    /// mathematically guaranteed.
    pub fn vote(&self, proposal_id: &str, voter: ProcessId, vote: Vote) -> Option<Decision> {
        let mut proposals = self.proposals.lock();
        let state = proposals.get_mut(proposal_id)?;
        if !matches!(state.decision, Decision::Pending) {
            return Some(state.decision.clone());
        }
        if !state.voters.contains(&voter) {
            return Some(state.decision.clone());
        }
        state.votes.insert(voter, vote);

        if let VotingMode::Quorum {
            threshold_numerator,
            threshold_denominator,
        } = state.mode
        {
            let total = state.voters.len() as u32;
            let approvals = state.votes.values().filter(|v| **v == Vote::Approve).count() as u32;
            let rejections = state.votes.values().filter(|v| **v == Vote::Reject).count() as u32;

            if approvals * threshold_denominator >= total * threshold_numerator {
                state.decision = Decision::Approved {
                    reason: format!("{approvals}/{total} approved"),
                };
            } else if state.votes.len() as u32 == total {
                state.decision = Decision::Rejected {
                    reason: format!("{rejections}/{total} rejected, quorum not met"),
                };
            }
        }

        Some(state.decision.clone())
    }

    pub fn decision(&self, proposal_id: &str) -> Option<Decision> {
        self.proposals
            .lock()
            .get(proposal_id)
            .map(|s| s.decision.clone())
    }
}

#[cfg(test)]
#[path = "consensus_tests.rs"]
mod tests;
