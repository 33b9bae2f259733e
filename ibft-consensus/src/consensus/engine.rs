use std::fmt;
use std::sync::Arc;

use ibft_common::{AcceptAllSignatures, Message, MessageType, NodeIndex, Round, SignatureVerifier, Value};
use tracing::{debug, info, warn};

use crate::{hooks::ValueStrategy, ports::Broadcaster};

use super::{
    config::ConsensusConfig,
    evaluator::Thresholds,
    state::{ConsensusPhase, ConsensusSnapshot, Directive, QuorumKind, RoundState},
    store::RoundStore,
};

/// Máquina de estados IBFT de um nó.
///
/// Owns the round state and the message store. Not synchronized: the caller
/// must feed [`Consensus::process`] and [`Consensus::on_round_timeout`] from a
/// single task.
pub struct Consensus {
    pub(super) config: ConsensusConfig,
    pub(super) thresholds: Thresholds,
    pub(super) state: RoundState,
    pub(super) store: RoundStore,
    pub(super) strategy: Arc<dyn ValueStrategy>,
    pub(super) broadcaster: Arc<dyn Broadcaster>,
    pub(super) verifier: Arc<dyn SignatureVerifier>,
}

impl Consensus {
    pub fn new(config: ConsensusConfig, strategy: Arc<dyn ValueStrategy>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        let thresholds = config.quorum.thresholds(&config.registry);
        let state = RoundState::new(config.leader_of(1));

        info!(
            "🧭 Consensus criado: node={:?} peso_total={} quorum={} round_change={}",
            config.node_identity,
            config.registry.total_weight(),
            thresholds.byzantine_quorum,
            thresholds.round_change
        );

        Self {
            config,
            thresholds,
            state,
            store: RoundStore::new(),
            strategy,
            broadcaster,
            verifier: Arc::new(AcceptAllSignatures),
        }
    }

    pub fn with_signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Handles one inbound message and tells the caller what to do with the timer.
    pub fn process(&mut self, message: Message) -> Directive {
        if self.state.phase() == ConsensusPhase::Decided {
            debug!("Já decidido, ignorando {}", message);
            return Directive::MessageRejected;
        }
        if message.kind() != MessageType::Commit && message.round() < self.state.round() {
            debug!("Mensagem de rodada antiga (atual={}): {}", self.state.round(), message);
            return Directive::MessageRejected;
        }
        if let Err(e) = self.validate(&message) {
            warn!("⚠️ Mensagem rejeitada {}: {}", message, e);
            return Directive::MessageRejected;
        }

        let before = self.position();
        if !self.store.add_message(message.clone()) {
            debug!("Mensagem duplicada: {}", message);
            return Directive::NotNewMessage;
        }
        debug!("📥 {}", message);

        let directive = match message.kind() {
            MessageType::PrePrepare => self.on_pre_prepare(&message),
            MessageType::Prepare => self.on_prepare(&message),
            MessageType::Commit => self.on_commit(&message),
            MessageType::RoundChange => self.on_round_change(&message),
        };
        self.settle(before, directive)
    }

    /// Round timer expired: move to the next round and ask peers to follow.
    ///
    /// Returns [`Directive::StartTimer`] when a buffered proposal for the new
    /// round was accepted on the way, [`Directive::NoChange`] otherwise.
    pub fn on_round_timeout(&mut self) -> Directive {
        if self.state.phase() == ConsensusPhase::Decided {
            debug!("Timeout após decisão ignorado");
            return Directive::NoChange;
        }
        let Some(next) = self.state.round().checked_add(1) else {
            warn!("⚠️ Rodada {} é a última possível, timeout ignorado", self.state.round());
            return Directive::NoChange;
        };

        let before = self.position();
        self.state.enter_round(next, self.config.leader_of(next));
        self.state.set_phase(ConsensusPhase::RoundTimeout);

        info!("⏰ Round timeout, indo para rodada {}", next);
        tracing::info!(
            target: "consensus",
            "EVENT:ROUND_TIMEOUT node={:?} round={} leader={} prepared_round={}",
            self.config.node_identity,
            next,
            self.state.leader(),
            self.state.prepared_round()
        );

        self.send_round_change();
        self.settle(before, Directive::NoChange)
    }

    /// Sends the round-1 proposal if this node leads it and nothing happened yet.
    /// Later rounds are proposed from a ROUND_CHANGE quorum instead.
    pub fn broadcast_proposal(&mut self) -> bool {
        let round = self.state.round();
        let Some(me) = self.config.node_identity else {
            return false;
        };
        if me != self.state.leader() || round != 1 || self.state.phase() != ConsensusPhase::PrePrepared {
            debug!("Sem proposta inicial: node={} leader={} round={} fase={}", me, self.state.leader(), round, self.state.phase());
            return false;
        }

        let value = self.strategy.propose_value(round);
        tracing::info!(target: "consensus", "EVENT:PROPOSE node={} round={} value={}", me, round, value);
        self.send(Message::pre_prepare(round, me, value, Vec::new()));
        true
    }

    pub fn snapshot(&self) -> ConsensusSnapshot {
        self.state.snapshot()
    }

    pub fn is_decided(&self) -> bool {
        self.state.phase() == ConsensusPhase::Decided
    }

    pub fn phase(&self) -> ConsensusPhase {
        self.state.phase()
    }

    pub fn round(&self) -> Round {
        self.state.round()
    }

    pub fn leader(&self) -> NodeIndex {
        self.state.leader()
    }

    pub fn prepared_round(&self) -> Round {
        self.state.prepared_round()
    }

    pub fn prepared_value(&self) -> Option<&Value> {
        self.state.prepared_value()
    }

    pub fn decided_value(&self) -> Option<&Value> {
        self.state.decided_value()
    }

    pub fn store(&self) -> &RoundStore {
        &self.store
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub(super) fn position(&self) -> (ConsensusPhase, Round) {
        (self.state.phase(), self.state.round())
    }

    /// Runs the buffered-message sweep when the step moved the node.
    fn settle(&mut self, before: (ConsensusPhase, Round), directive: Directive) -> Directive {
        if !self.config.reconsider_buffered || self.is_decided() || self.position() == before {
            return directive;
        }
        directive.merge(self.replay_current_round())
    }

    pub(super) fn send_round_change(&self) {
        let Some(me) = self.config.node_identity else {
            return;
        };
        let prepared_round = self.state.prepared_round();
        let justification = self
            .store
            .get_quorum_messages(prepared_round, QuorumKind::PrepareQuorum)
            .to_vec();
        self.send(Message::round_change(
            self.state.round(),
            me,
            prepared_round,
            self.state.prepared_value().cloned(),
            justification,
        ));
    }

    /// Observers build nothing, so this is only reached by participants.
    pub(super) fn send(&self, message: Message) {
        debug!("📤 {}", message);
        self.broadcaster.broadcast(&message);
    }
}

impl fmt::Debug for Consensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consensus")
            .field("node", &self.config.node_identity)
            .field("thresholds", &self.thresholds)
            .field("state", &self.state)
            .field("stored", &self.store.len())
            .finish_non_exhaustive()
    }
}
