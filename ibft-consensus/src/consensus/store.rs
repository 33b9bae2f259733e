use std::collections::{BTreeMap, HashMap};

use ibft_common::{Message, MessageType, Round};

use super::state::QuorumKind;

/// Armazena as mensagens recebidas por rodada e por tipo, e os certificados de quorum.
///
/// At most one message is kept per `(round, type, sender)`; retrieval follows
/// insertion order. Quorum certificates are write-once per `(round, kind)`.
#[derive(Debug, Default, Clone)]
pub struct RoundStore {
    // Round -> Type -> messages
    messages: BTreeMap<Round, HashMap<MessageType, Vec<Message>>>,

    // Round -> Kind -> frozen quorum
    quorum_messages: BTreeMap<Round, HashMap<QuorumKind, Vec<Message>>>,
}

impl RoundStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `message` unless one with the same round, type and sender is
    /// already stored. Returns `false` for such a duplicate.
    pub fn add_message(&mut self, message: Message) -> bool {
        let bucket = self
            .messages
            .entry(message.round())
            .or_default()
            .entry(message.kind())
            .or_default();

        if bucket.iter().any(|existing| existing.sender() == message.sender()) {
            return false;
        }
        bucket.push(message);
        true
    }

    /// Mensagens de um tipo numa rodada; vazio se nenhuma foi registrada.
    pub fn get_messages(&self, round: Round, kind: MessageType) -> &[Message] {
        self.messages
            .get(&round)
            .and_then(|by_kind| by_kind.get(&kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Messages of `kind` from every round strictly after `round`, lowest round first.
    pub fn messages_after(&self, round: Round, kind: MessageType) -> impl Iterator<Item = &Message> + '_ {
        self.messages
            .range(round.saturating_add(1)..)
            .filter_map(move |(_, by_kind)| by_kind.get(&kind))
            .flatten()
    }

    /// Freezes a quorum certificate.
    ///
    /// # Panics
    ///
    /// If a certificate for `(round, kind)` already exists. Overwriting one
    /// means the state machine is broken, not that a peer misbehaved.
    pub fn add_quorum_messages(&mut self, round: Round, kind: QuorumKind, messages: Vec<Message>) {
        let slot = self.quorum_messages.entry(round).or_default();
        assert!(
            !slot.contains_key(&kind),
            "quorum certificate {:?} for round {} already recorded",
            kind,
            round
        );
        slot.insert(kind, messages);
    }

    pub fn get_quorum_messages(&self, round: Round, kind: QuorumKind) -> &[Message] {
        self.quorum_messages
            .get(&round)
            .and_then(|by_kind| by_kind.get(&kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of stored messages, all rounds and types.
    pub fn len(&self) -> usize {
        self.messages.values().flat_map(|by_kind| by_kind.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
