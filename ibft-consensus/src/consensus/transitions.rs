use std::collections::HashSet;

use ibft_common::{Message, MessageType, Round};
use tracing::{debug, info};

use super::{
    evaluator::{best_supported, highest_prepared, sender_weight},
    state::{ConsensusPhase, Directive, QuorumKind},
    Consensus,
};

impl Consensus {
    pub(super) fn on_pre_prepare(&mut self, message: &Message) -> Directive {
        if message.round() > self.state.round() {
            return Directive::FutureMessage;
        }
        if !self.state.phase().accepts_pre_prepare() {
            return Directive::MsgNotProcessed;
        }
        self.accept_proposal(message)
    }

    fn accept_proposal(&mut self, message: &Message) -> Directive {
        let Some(value) = message.value().cloned() else {
            return Directive::MsgNotProcessed;
        };
        let round = self.state.round();
        self.state.set_phase(ConsensusPhase::Prepared);

        tracing::info!(
            target: "consensus",
            "EVENT:PRE_PREPARED node={:?} round={} leader={} value={}",
            self.config.node_identity,
            round,
            message.sender(),
            value
        );

        if let Some(me) = self.config.node_identity {
            self.send(Message::prepare(round, me, value));
        }
        Directive::StartTimer
    }

    pub(super) fn on_prepare(&mut self, message: &Message) -> Directive {
        if message.round() > self.state.round() {
            return Directive::FutureMessage;
        }
        if !self.state.phase().accepts_prepare() {
            return Directive::MsgNotProcessed;
        }
        self.try_prepare_quorum();
        // A PREPARE quorum does not touch the timer.
        Directive::NoChange
    }

    /// Tallies the PREPAREs of the current round and moves to COMMITTED on a quorum.
    fn try_prepare_quorum(&mut self) -> bool {
        let round = self.state.round();
        let Some(tally) = best_supported(self.store.get_messages(round, MessageType::Prepare), &self.config.registry)
        else {
            return false;
        };
        if tally.weight < self.thresholds.byzantine_quorum {
            return false;
        }

        let value = tally.value;
        self.state.set_prepared(round, value.clone());
        self.store.add_quorum_messages(round, QuorumKind::PrepareQuorum, tally.supporters);
        self.state.set_phase(ConsensusPhase::Committed);

        tracing::info!(
            target: "consensus",
            "EVENT:COMMITTED node={:?} round={} value={} weight={}",
            self.config.node_identity,
            round,
            value,
            tally.weight
        );

        if let Some(me) = self.config.node_identity {
            self.send(Message::commit(round, me, value));
        }
        true
    }

    pub(super) fn on_commit(&mut self, message: &Message) -> Directive {
        if self.try_commit_quorum(message.round()) {
            Directive::StopTimer
        } else {
            Directive::NoChange
        }
    }

    /// COMMITs may complete any round, not only the current one.
    fn try_commit_quorum(&mut self, round: Round) -> bool {
        let Some(tally) = best_supported(self.store.get_messages(round, MessageType::Commit), &self.config.registry)
        else {
            return false;
        };
        if tally.weight < self.thresholds.byzantine_quorum {
            return false;
        }

        let value = tally.value;
        self.state.decide(value.clone());
        self.store.add_quorum_messages(round, QuorumKind::CommitQuorum, tally.supporters);

        info!("✅ Decidido na rodada {}: {}", round, value);
        tracing::info!(
            target: "consensus",
            "EVENT:DECIDED node={:?} round={} value={} weight={}",
            self.config.node_identity,
            round,
            value,
            tally.weight
        );
        true
    }

    pub(super) fn on_round_change(&mut self, message: &Message) -> Directive {
        let current = self.state.round();

        if message.round() > current {
            if self.state.phase() != ConsensusPhase::RoundChanged && self.try_future_round_change() {
                return Directive::StartTimer;
            }
        } else if message.round() == current {
            self.try_round_change_quorum();
        }
        Directive::NoChange
    }

    /// Enough weight already signals later rounds: jump to the lowest of them.
    fn try_future_round_change(&mut self) -> bool {
        let current = self.state.round();
        let mut seen = HashSet::new();
        let signals: Vec<&Message> = self
            .store
            .messages_after(current, MessageType::RoundChange)
            .filter(|rc| seen.insert(rc.sender()))
            .collect();

        let weight = sender_weight(signals.iter().copied(), &self.config.registry);
        if weight < self.thresholds.round_change {
            return false;
        }
        let Some(target) = signals.iter().map(|rc| rc.round()).min() else {
            return false;
        };

        self.state.enter_round(target, self.config.leader_of(target));
        self.state.set_phase(ConsensusPhase::RoundChanged);

        info!("🔀 {} nós sinalizaram rodadas futuras (peso {}), indo para rodada {}", signals.len(), weight, target);
        tracing::info!(
            target: "consensus",
            "EVENT:ROUND_CHANGED node={:?} from={} round={} leader={} weight={}",
            self.config.node_identity,
            current,
            target,
            self.state.leader(),
            weight
        );

        self.send_round_change();
        true
    }

    /// A Byzantine quorum of ROUND_CHANGE for the current round justifies a new
    /// proposal. The leader re-proposes the highest prepared value, if any.
    fn try_round_change_quorum(&mut self) -> bool {
        if !self.state.phase().awaits_round_change_quorum() {
            return false;
        }
        let round = self.state.round();
        let round_changes = self.store.get_messages(round, MessageType::RoundChange);
        let weight = sender_weight(round_changes, &self.config.registry);
        if weight < self.thresholds.byzantine_quorum {
            return false;
        }

        let carried = highest_prepared(round_changes).and_then(|rc| rc.prepared()).and_then(|(_, value)| value.cloned());
        let justification = round_changes.to_vec();
        self.state.set_phase(ConsensusPhase::PrePrepared);
        debug!("Quorum de ROUND_CHANGE na rodada {} (peso {})", round, weight);

        let Some(me) = self.config.node_identity else {
            return true;
        };
        if me == self.state.leader() {
            let reproposal = carried.is_some();
            let value = carried.unwrap_or_else(|| self.strategy.propose_value(round));
            tracing::info!(
                target: "consensus",
                "EVENT:PROPOSE node={} round={} value={} reproposal={} justification={}",
                me,
                round,
                value,
                reproposal,
                justification.len()
            );
            self.send(Message::pre_prepare(round, me, value, justification));
        }
        true
    }

    /// Re-examines what is already stored for the current round, repeating
    /// while the state keeps moving.
    pub(super) fn replay_current_round(&mut self) -> Directive {
        let mut directive = Directive::NoChange;
        loop {
            if self.is_decided() {
                break;
            }
            let before = self.position();
            let round = self.state.round();

            if self.state.phase().accepts_pre_prepare() {
                let proposal = self.store.get_messages(round, MessageType::PrePrepare).first().cloned();
                if let Some(proposal) = proposal {
                    debug!("Reprocessando {}", proposal);
                    directive = directive.merge(self.accept_proposal(&proposal));
                }
            }
            if self.state.phase().accepts_prepare() {
                self.try_prepare_quorum();
            }
            if self.try_commit_quorum(round) {
                directive = directive.merge(Directive::StopTimer);
                break;
            }
            self.try_round_change_quorum();

            if self.position() == before {
                break;
            }
        }
        directive
    }
}
