//! JSON wire form of [`Message`]:
//!
//! ```json
//! {"type": "ROUND_CHANGE", "round": 2, "sender": 1, "signature": "",
//!  "data": {"prepared_round": 1, "prepared_value": 4, "justification": [ ...messages... ]}}
//! ```
//!
//! `data.justification` is always written, empty when there is nothing to carry.
//! `prepared_value` is written as `null` when the sender never prepared.
//!
//! Round 0 is refused at every nesting level except for the PREPARE proof of a
//! ROUND_CHANGE whose `prepared_round` is 0. That proof can only exist when
//! `prepared_value` is set without a prepared round; whether such a pair is
//! acceptable is decided by the engine's prepared-pair check, not here.

use serde::{Deserialize, Deserializer, Serialize};

use super::{errors::MessageError, Message, MessageType, Payload};
use crate::{NodeIndex, Round, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    kind: MessageType,
    round: Round,
    sender: NodeIndex,
    #[serde(default, with = "hex::serde")]
    signature: Vec<u8>,
    data: WireData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    prepared_round: Option<Round>,

    // Outer Option: key present or not. Inner Option: JSON null or a value.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    prepared_value: Option<Option<Value>>,

    #[serde(default)]
    justification: Vec<WireMessage>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer).map(Some)
}

impl From<Message> for WireMessage {
    fn from(msg: Message) -> Self {
        let kind = msg.kind();
        let data = match msg.payload {
            Payload::PrePrepare { value, justification } => WireData {
                value: Some(value),
                justification: justification.into_iter().map(WireMessage::from).collect(),
                ..Default::default()
            },
            Payload::Prepare { value } | Payload::Commit { value } => WireData {
                value: Some(value),
                ..Default::default()
            },
            Payload::RoundChange {
                prepared_round,
                prepared_value,
                justification,
            } => WireData {
                prepared_round: Some(prepared_round),
                prepared_value: Some(prepared_value),
                justification: justification.into_iter().map(WireMessage::from).collect(),
                ..Default::default()
            },
        };
        WireMessage {
            kind,
            round: msg.round,
            sender: msg.sender,
            signature: msg.signature,
            data,
        }
    }
}

impl TryFrom<WireMessage> for Message {
    type Error = MessageError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        decode(wire, false)
    }
}

fn decode(wire: WireMessage, allow_round_zero: bool) -> Result<Message, MessageError> {
    let kind = wire.kind;
    if wire.round == 0 && !allow_round_zero {
        return Err(MessageError::ZeroRound { kind });
    }
    let missing = |field| MessageError::MissingField { kind, field };
    let data = wire.data;

    let payload = match kind {
        MessageType::PrePrepare => Payload::PrePrepare {
            value: data.value.ok_or_else(|| missing("value"))?,
            justification: decode_all(data.justification, false)?,
        },
        MessageType::Prepare => Payload::Prepare {
            value: data.value.ok_or_else(|| missing("value"))?,
        },
        MessageType::Commit => Payload::Commit {
            value: data.value.ok_or_else(|| missing("value"))?,
        },
        MessageType::RoundChange => {
            let prepared_round = data.prepared_round.ok_or_else(|| missing("prepared_round"))?;
            Payload::RoundChange {
                prepared_round,
                prepared_value: data.prepared_value.ok_or_else(|| missing("prepared_value"))?,
                justification: decode_all(data.justification, prepared_round == 0)?,
            }
        }
    };

    Ok(Message {
        round: wire.round,
        sender: wire.sender,
        signature: wire.signature,
        payload,
    })
}

fn decode_all(entries: Vec<WireMessage>, allow_round_zero: bool) -> Result<Vec<Message>, MessageError> {
    entries.into_iter().map(|entry| decode(entry, allow_round_zero)).collect()
}
