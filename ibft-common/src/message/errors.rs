use thiserror::Error;

use super::MessageType;

/// Errors raised while decoding a message from its wire form.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The bytes are not valid JSON or do not follow the message schema.
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// `data` lacks a field required by the message type, e.g. `value` on a
    /// PREPARE or `prepared_value` on a ROUND_CHANGE.
    #[error("Missing field `{field}` in {kind} message data")]
    MissingField { kind: MessageType, field: &'static str },

    /// Rounds start at 1.
    #[error("{kind} message with round 0")]
    ZeroRound { kind: MessageType },
}
