use std::fmt;

use ibft_common::{NodeIndex, Round, Value};
use serde::{Deserialize, Serialize};

/// Phase of the local node within the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusPhase {
    /// Waiting for the leader's proposal.
    PrePrepared,
    /// Proposal accepted, PREPARE sent.
    Prepared,
    /// PREPARE quorum seen, COMMIT sent.
    Committed,
    /// COMMIT quorum seen. Terminal.
    Decided,
    /// The round timer fired and the node moved to the next round.
    RoundTimeout,
    /// Enough peers signalled a later round and the node jumped to it.
    RoundChanged,
}

impl ConsensusPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusPhase::PrePrepared => "PRE_PREPARED",
            ConsensusPhase::Prepared => "PREPARED",
            ConsensusPhase::Committed => "COMMITTED",
            ConsensusPhase::Decided => "DECIDED",
            ConsensusPhase::RoundTimeout => "ROUND_TIMEOUT",
            ConsensusPhase::RoundChanged => "ROUND_CHANGED",
        }
    }

    pub(crate) fn accepts_pre_prepare(&self) -> bool {
        matches!(
            self,
            ConsensusPhase::PrePrepared | ConsensusPhase::RoundTimeout | ConsensusPhase::RoundChanged
        )
    }

    pub(crate) fn accepts_prepare(&self) -> bool {
        self.accepts_pre_prepare() || *self == ConsensusPhase::Prepared
    }

    pub(crate) fn awaits_round_change_quorum(&self) -> bool {
        matches!(self, ConsensusPhase::RoundTimeout | ConsensusPhase::RoundChanged)
    }
}

impl fmt::Display for ConsensusPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`crate::Consensus::process`], telling the caller what happened
/// to the message and what to do with the round timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Directive {
    /// Invalid, or not admissible in the current state. Nothing was stored.
    MessageRejected,
    /// A message with the same (round, type, sender) was already stored.
    NotNewMessage,
    /// Stored, but the current phase does not act on this type.
    MsgNotProcessed,
    /// Stored for a later round.
    FutureMessage,
    /// Leave the timer as it is.
    NoChange,
    /// (Re)start the round timer.
    StartTimer,
    /// Stop the round timer; the node decided.
    StopTimer,
}

impl Directive {
    /// Combines the directives of two consecutive steps. Timer actions win over
    /// bookkeeping outcomes, and stopping wins over starting.
    pub fn merge(self, other: Directive) -> Directive {
        match (self, other) {
            (Directive::StopTimer, _) | (_, Directive::StopTimer) => Directive::StopTimer,
            (Directive::StartTimer, _) | (_, Directive::StartTimer) => Directive::StartTimer,
            (first, _) => first,
        }
    }
}

/// Which certificate a frozen quorum belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuorumKind {
    PrepareQuorum,
    CommitQuorum,
}

/// Mutable protocol state of one node.
///
/// Setters enforce the state-machine invariants and panic on violation:
/// the round never decreases and nothing leaves `DECIDED`.
#[derive(Debug, Clone)]
pub(crate) struct RoundState {
    phase: ConsensusPhase,
    round: Round,
    prepared_round: Round,
    prepared_value: Option<Value>,
    decided_value: Option<Value>,
    leader: NodeIndex,
}

impl RoundState {
    pub(crate) fn new(leader: NodeIndex) -> Self {
        Self {
            phase: ConsensusPhase::PrePrepared,
            round: 1,
            prepared_round: 0,
            prepared_value: None,
            decided_value: None,
            leader,
        }
    }

    pub(crate) fn phase(&self) -> ConsensusPhase {
        self.phase
    }

    pub(crate) fn round(&self) -> Round {
        self.round
    }

    pub(crate) fn prepared_round(&self) -> Round {
        self.prepared_round
    }

    pub(crate) fn prepared_value(&self) -> Option<&Value> {
        self.prepared_value.as_ref()
    }

    pub(crate) fn decided_value(&self) -> Option<&Value> {
        self.decided_value.as_ref()
    }

    pub(crate) fn leader(&self) -> NodeIndex {
        self.leader
    }

    pub(crate) fn set_phase(&mut self, phase: ConsensusPhase) {
        assert!(
            self.phase != ConsensusPhase::Decided,
            "state transition {} -> {} after decision",
            self.phase,
            phase
        );
        self.phase = phase;
    }

    pub(crate) fn enter_round(&mut self, round: Round, leader: NodeIndex) {
        assert!(round >= self.round, "round moved backwards: {} -> {}", self.round, round);
        self.round = round;
        self.leader = leader;
    }

    pub(crate) fn set_prepared(&mut self, round: Round, value: Value) {
        self.prepared_round = round;
        self.prepared_value = Some(value);
    }

    pub(crate) fn decide(&mut self, value: Value) {
        self.set_phase(ConsensusPhase::Decided);
        self.decided_value = Some(value);
    }

    pub(crate) fn snapshot(&self) -> ConsensusSnapshot {
        ConsensusSnapshot {
            state: self.phase,
            round: self.round,
            prepared_round: self.prepared_round,
            prepared_value: self.prepared_value.clone(),
            decided_value: self.decided_value.clone(),
            leader: self.leader,
        }
    }
}

/// Read-only copy of the protocol state, e.g. for a status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusSnapshot {
    pub state: ConsensusPhase,
    pub round: Round,
    pub prepared_round: Round,
    pub prepared_value: Option<Value>,
    pub decided_value: Option<Value>,
    pub leader: NodeIndex,
}
