use std::collections::HashSet;

use ibft_common::{Message, MessageType, NodeIndex, NodeInfo, Round, Value, Weight};
use thiserror::Error;

use super::{
    config::PreparedPairCheck,
    evaluator::{highest_prepared, sender_weight},
    Consensus,
};

/// Why a message was refused. Never leaves [`Consensus::process`] except as
/// `MESSAGE_REJECTED`; [`Consensus::justify_pre_prepare`] exposes it directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} from node {sender} for round {round}, but the leader is node {leader}")]
    NotLeader {
        kind: MessageType,
        sender: NodeIndex,
        round: Round,
        leader: NodeIndex,
    },

    #[error("{kind} round {round} outside 1..{max}", max = Round::MAX)]
    RoundOutOfRange { kind: MessageType, round: Round },

    #[error("{kind} expected for round {expected}, got round {got}")]
    WrongRound { kind: MessageType, expected: Round, got: Round },

    #[error("{kind} from unknown node {sender}")]
    UnknownSender { kind: MessageType, sender: NodeIndex },

    #[error("Assinatura inválida: {kind} from node {sender}")]
    BadSignature { kind: MessageType, sender: NodeIndex },

    #[error("{kind} carries an invalid value {value}")]
    InvalidData { kind: MessageType, value: Value },

    #[error("justification entry must be {expected}, got {got}")]
    WrongType { expected: MessageType, got: MessageType },

    #[error("prepared_round {prepared_round} is not below round {round}")]
    PreparedRoundOutOfRange { prepared_round: Round, round: Round },

    #[error("prepared_round {prepared_round} and prepared_value disagree on whether a value was prepared")]
    InconsistentPreparedPair { prepared_round: Round },

    #[error("justification holds two {kind} messages from node {sender}")]
    DuplicateJustificationSender { kind: MessageType, sender: NodeIndex },

    #[error("justification value mismatch: expected {expected:?}, got {got:?}")]
    JustificationValueMismatch { expected: Option<Value>, got: Option<Value> },

    #[error("{kind} justification weight {got} below quorum {needed}")]
    InsufficientJustification { kind: MessageType, got: Weight, needed: Weight },

    #[error("proposal {proposed} drops the prepared value {prepared}")]
    ReproposalMismatch { proposed: Value, prepared: Value },
}

impl Consensus {
    /// Checks a message against its own round.
    ///
    /// The round must be at least 1 and below `Round::MAX`, so a timeout can
    /// always move past it. Justification entries are pinned to the round they
    /// prove instead.
    pub(super) fn validate(&self, message: &Message) -> Result<(), ValidationError> {
        let round = message.round();
        if round == 0 || round == Round::MAX {
            return Err(ValidationError::RoundOutOfRange {
                kind: message.kind(),
                round,
            });
        }
        match message.kind() {
            MessageType::PrePrepare => self.validate_pre_prepare(message, round),
            MessageType::Prepare | MessageType::Commit => self.validate_vote(message, round),
            MessageType::RoundChange => self.validate_round_change(message, round),
        }
    }

    fn validate_pre_prepare(&self, message: &Message, round: Round) -> Result<(), ValidationError> {
        let kind = message.kind();
        let leader = self.config.leader_of(round);
        if message.sender() != leader {
            return Err(ValidationError::NotLeader {
                kind,
                sender: message.sender(),
                round,
                leader,
            });
        }
        self.check_envelope(message, round)?;
        self.check_value(message, round)?;
        self.justify_pre_prepare(message)
    }

    /// PREPARE and COMMIT share the same rules.
    fn validate_vote(&self, message: &Message, round: Round) -> Result<(), ValidationError> {
        self.check_envelope(message, round)?;
        self.check_value(message, round)
    }

    fn validate_round_change(&self, message: &Message, round: Round) -> Result<(), ValidationError> {
        self.check_envelope(message, round)?;

        let Some((prepared_round, prepared_value)) = message.prepared() else {
            return Err(ValidationError::WrongType {
                expected: MessageType::RoundChange,
                got: message.kind(),
            });
        };
        if prepared_round >= round {
            return Err(ValidationError::PreparedRoundOutOfRange { prepared_round, round });
        }

        let has_round = prepared_round > 0;
        let has_value = prepared_value.is_some();
        if self.config.prepared_pair_check == PreparedPairCheck::Coupled && has_round != has_value {
            return Err(ValidationError::InconsistentPreparedPair { prepared_round });
        }

        if has_round || has_value {
            self.check_prepare_justification(message.justification(), prepared_value, prepared_round)?;
        }
        Ok(())
    }

    /// Proves that `value` was prepared in `prepared_round`: a Byzantine quorum
    /// of distinct, valid PREPAREs for exactly that value and round.
    fn check_prepare_justification(
        &self,
        prepares: &[Message],
        value: Option<&Value>,
        prepared_round: Round,
    ) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for prepare in prepares {
            if prepare.kind() != MessageType::Prepare {
                return Err(ValidationError::WrongType {
                    expected: MessageType::Prepare,
                    got: prepare.kind(),
                });
            }
            if !seen.insert(prepare.sender()) {
                return Err(ValidationError::DuplicateJustificationSender {
                    kind: MessageType::Prepare,
                    sender: prepare.sender(),
                });
            }
            self.validate_vote(prepare, prepared_round)?;
            if prepare.value() != value {
                return Err(ValidationError::JustificationValueMismatch {
                    expected: value.cloned(),
                    got: prepare.value().cloned(),
                });
            }
        }

        let needed = self.thresholds.byzantine_quorum;
        let got = sender_weight(prepares, &self.config.registry);
        if got < needed {
            return Err(ValidationError::InsufficientJustification {
                kind: MessageType::Prepare,
                got,
                needed,
            });
        }
        Ok(())
    }

    /// Justification check for a PRE_PREPARE of round > 1.
    ///
    /// The proposal must carry a Byzantine quorum of valid ROUND_CHANGE messages
    /// for its round. If the one with the highest `prepared_round` reports a
    /// prepared value, that value must be backed by its own PREPARE quorum and
    /// the proposal must re-propose it.
    pub fn justify_pre_prepare(&self, message: &Message) -> Result<(), ValidationError> {
        let round = message.round();
        if round <= 1 {
            return Ok(());
        }

        let round_changes = message.justification();
        let mut seen = HashSet::new();
        for rc in round_changes {
            if rc.kind() != MessageType::RoundChange {
                return Err(ValidationError::WrongType {
                    expected: MessageType::RoundChange,
                    got: rc.kind(),
                });
            }
            if !seen.insert(rc.sender()) {
                return Err(ValidationError::DuplicateJustificationSender {
                    kind: MessageType::RoundChange,
                    sender: rc.sender(),
                });
            }
            self.validate_round_change(rc, round)?;
        }

        let needed = self.thresholds.byzantine_quorum;
        let got = sender_weight(round_changes, &self.config.registry);
        if got < needed {
            return Err(ValidationError::InsufficientJustification {
                kind: MessageType::RoundChange,
                got,
                needed,
            });
        }

        let Some(highest) = highest_prepared(round_changes) else {
            return Ok(());
        };
        if let Some((prepared_round, Some(prepared))) = highest.prepared() {
            self.check_prepare_justification(highest.justification(), Some(prepared), prepared_round)?;
            if let Some(proposed) = message.value() {
                if proposed != prepared {
                    return Err(ValidationError::ReproposalMismatch {
                        proposed: proposed.clone(),
                        prepared: prepared.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Sender known, round as expected, signature valid.
    fn check_envelope(&self, message: &Message, round: Round) -> Result<(), ValidationError> {
        let kind = message.kind();
        let signer = self.signer(message)?;
        if message.round() != round {
            return Err(ValidationError::WrongRound {
                kind,
                expected: round,
                got: message.round(),
            });
        }
        if !message.verify_signature(self.verifier.as_ref(), signer) {
            return Err(ValidationError::BadSignature {
                kind,
                sender: message.sender(),
            });
        }
        Ok(())
    }

    fn check_value(&self, message: &Message, round: Round) -> Result<(), ValidationError> {
        match message.value() {
            Some(value) if self.strategy.validate_value(round, value) => Ok(()),
            Some(value) => Err(ValidationError::InvalidData {
                kind: message.kind(),
                value: value.clone(),
            }),
            None => Err(ValidationError::WrongType {
                expected: message.kind(),
                got: MessageType::RoundChange,
            }),
        }
    }

    fn signer(&self, message: &Message) -> Result<&NodeInfo, ValidationError> {
        self.config
            .registry
            .get(message.sender())
            .ok_or(ValidationError::UnknownSender {
                kind: message.kind(),
                sender: message.sender(),
            })
    }
}
