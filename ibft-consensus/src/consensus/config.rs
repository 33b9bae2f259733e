use std::time::Duration;

use chrono::{DateTime, Utc};
use ibft_common::{NodeIndex, NodeRegistry, Round};
use serde::{Deserialize, Serialize};

use super::evaluator::QuorumPolicy;

/// How the leader of a round is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderPolicy {
    /// Rotates over registry indices in ascending order: round 1 -> first index.
    #[default]
    RoundRobin,
    /// The same node leads every round.
    Static(NodeIndex),
}

impl LeaderPolicy {
    pub fn leader_of(&self, round: Round, registry: &NodeRegistry) -> NodeIndex {
        match self {
            LeaderPolicy::RoundRobin => registry.index_at(round.saturating_sub(1)),
            LeaderPolicy::Static(index) => *index,
        }
    }
}

/// Treatment of `prepared_round` / `prepared_value` in ROUND_CHANGE messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreparedPairCheck {
    /// Justification is required when either half of the pair is set.
    #[default]
    Either,
    /// Additionally, both halves must be set or both unset.
    Coupled,
}

/// Construction-time parameters of a [`crate::Consensus`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub registry: NodeRegistry,
    #[serde(default)]
    pub quorum: QuorumPolicy,
    pub round_duration: Duration,
    pub start_time: DateTime<Utc>,
    /// `None` runs the node as an observer: it tracks state but never sends.
    pub node_identity: Option<NodeIndex>,
    #[serde(default)]
    pub leader_policy: LeaderPolicy,
    #[serde(default)]
    pub prepared_pair_check: PreparedPairCheck,
    /// Re-examine stored messages of the current round after each state change.
    #[serde(default = "default_reconsider")]
    pub reconsider_buffered: bool,
}

fn default_reconsider() -> bool {
    true
}

impl ConsensusConfig {
    pub fn new(registry: NodeRegistry, node_identity: Option<NodeIndex>) -> Self {
        Self {
            registry,
            quorum: QuorumPolicy::default(),
            round_duration: Duration::from_secs(1),
            start_time: Utc::now(),
            node_identity,
            leader_policy: LeaderPolicy::default(),
            prepared_pair_check: PreparedPairCheck::default(),
            reconsider_buffered: true,
        }
    }

    pub fn with_quorum(mut self, quorum: QuorumPolicy) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn with_leader_policy(mut self, leader_policy: LeaderPolicy) -> Self {
        self.leader_policy = leader_policy;
        self
    }

    pub fn with_prepared_pair_check(mut self, check: PreparedPairCheck) -> Self {
        self.prepared_pair_check = check;
        self
    }

    pub fn with_reconsider_buffered(mut self, enabled: bool) -> Self {
        self.reconsider_buffered = enabled;
        self
    }

    pub fn with_timing(mut self, start_time: DateTime<Utc>, round_duration: Duration) -> Self {
        self.start_time = start_time;
        self.round_duration = round_duration;
        self
    }

    pub fn leader_of(&self, round: Round) -> NodeIndex {
        self.leader_policy.leader_of(round, &self.registry)
    }
}
