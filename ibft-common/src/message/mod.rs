//! message
//!
//! The consensus message exchanged between nodes.
//!
//! A [`Message`] is immutable once built. PRE_PREPARE and ROUND_CHANGE
//! messages embed other messages as justification, and the JSON codec in
//! [`codec`] keeps that nesting intact in both directions.

mod codec;
pub mod errors;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{auth::SignatureVerifier, registry::NodeInfo, NodeIndex, Round, Value};

pub use errors::MessageError;

/// Kind of a consensus message, serialized as `PRE_PREPARE`, `PREPARE`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    PrePrepare,
    Prepare,
    Commit,
    RoundChange,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::PrePrepare => "PRE_PREPARE",
            MessageType::Prepare => "PREPARE",
            MessageType::Commit => "COMMIT",
            MessageType::RoundChange => "ROUND_CHANGE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific content of a message (`data` on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Leader proposal. For rounds > 1 the justification is a quorum of ROUND_CHANGE messages.
    PrePrepare { value: Value, justification: Vec<Message> },
    Prepare { value: Value },
    Commit { value: Value },
    /// Carries the sender's last prepared round/value and the PREPARE quorum proving it.
    RoundChange {
        prepared_round: Round,
        prepared_value: Option<Value>,
        justification: Vec<Message>,
    },
}

/// Store identity of a message: at most one message per key is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageKey {
    pub round: Round,
    pub kind: MessageType,
    pub sender: NodeIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "codec::WireMessage", into = "codec::WireMessage")]
pub struct Message {
    round: Round,
    sender: NodeIndex,
    signature: Vec<u8>,
    payload: Payload,
}

impl Message {
    pub fn new(round: Round, sender: NodeIndex, payload: Payload) -> Self {
        Self {
            round,
            sender,
            signature: Vec::new(),
            payload,
        }
    }

    pub fn pre_prepare(round: Round, sender: NodeIndex, value: Value, justification: Vec<Message>) -> Self {
        Self::new(round, sender, Payload::PrePrepare { value, justification })
    }

    pub fn prepare(round: Round, sender: NodeIndex, value: Value) -> Self {
        Self::new(round, sender, Payload::Prepare { value })
    }

    pub fn commit(round: Round, sender: NodeIndex, value: Value) -> Self {
        Self::new(round, sender, Payload::Commit { value })
    }

    pub fn round_change(
        round: Round,
        sender: NodeIndex,
        prepared_round: Round,
        prepared_value: Option<Value>,
        justification: Vec<Message>,
    ) -> Self {
        Self::new(
            round,
            sender,
            Payload::RoundChange {
                prepared_round,
                prepared_value,
                justification,
            },
        )
    }

    /// Attaches signature bytes produced by an external signer.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = signature;
        self
    }

    pub fn kind(&self) -> MessageType {
        match self.payload {
            Payload::PrePrepare { .. } => MessageType::PrePrepare,
            Payload::Prepare { .. } => MessageType::Prepare,
            Payload::Commit { .. } => MessageType::Commit,
            Payload::RoundChange { .. } => MessageType::RoundChange,
        }
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn sender(&self) -> NodeIndex {
        self.sender
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn key(&self) -> MessageKey {
        MessageKey {
            round: self.round,
            kind: self.kind(),
            sender: self.sender,
        }
    }

    /// The carried value of PRE_PREPARE, PREPARE and COMMIT messages.
    pub fn value(&self) -> Option<&Value> {
        match &self.payload {
            Payload::PrePrepare { value, .. } | Payload::Prepare { value } | Payload::Commit { value } => Some(value),
            Payload::RoundChange { .. } => None,
        }
    }

    /// `(prepared_round, prepared_value)` of a ROUND_CHANGE message.
    pub fn prepared(&self) -> Option<(Round, Option<&Value>)> {
        match &self.payload {
            Payload::RoundChange {
                prepared_round,
                prepared_value,
                ..
            } => Some((*prepared_round, prepared_value.as_ref())),
            _ => None,
        }
    }

    /// Embedded justification messages; empty for PREPARE and COMMIT.
    pub fn justification(&self) -> &[Message] {
        match &self.payload {
            Payload::PrePrepare { justification, .. } | Payload::RoundChange { justification, .. } => justification,
            Payload::Prepare { .. } | Payload::Commit { .. } => &[],
        }
    }

    pub fn verify_signature(&self, verifier: &dyn SignatureVerifier, signer: &NodeInfo) -> bool {
        verifier.verify(self, signer)
    }

    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire bytes (UTF-8 JSON).
    pub fn to_bytes(&self) -> Result<Vec<u8>, MessageError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::PrePrepare { value, justification } => write!(
                f,
                "PRE_PREPARE(r={}, from={}, value={}, rc={})",
                self.round,
                self.sender,
                value,
                justification.len()
            ),
            Payload::Prepare { value } => write!(f, "PREPARE(r={}, from={}, value={})", self.round, self.sender, value),
            Payload::Commit { value } => write!(f, "COMMIT(r={}, from={}, value={})", self.round, self.sender, value),
            Payload::RoundChange {
                prepared_round,
                prepared_value,
                justification,
            } => write!(
                f,
                "ROUND_CHANGE(r={}, from={}, pr={}, pv={}, prepares={})",
                self.round,
                self.sender,
                prepared_round,
                prepared_value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "null".into()),
                justification.len()
            ),
        }
    }
}
