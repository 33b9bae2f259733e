use ibft_common::Message;
use ibft_consensus::{Consensus, ConsensusSnapshot, Directive};
use tokio::{
    sync::{mpsc, watch},
    time::{sleep_until, Duration, Instant},
};
use tracing::{debug, info};

use crate::timer::RoundTimer;

/// Serial consumer of the inbound queue.
///
/// Owns the [`Consensus`] instance: inbound messages, the initial proposal and
/// round timeouts all go through this one task, one at a time.
pub struct Worker {
    consensus: Consensus,
    inbox: mpsc::Receiver<Message>,
    status: watch::Sender<ConsensusSnapshot>,
    timer: RoundTimer,
    start: Instant,
}

impl Worker {
    /// The first timeout is scheduled for `start_time + round_duration`.
    pub fn new(consensus: Consensus, inbox: mpsc::Receiver<Message>, status: watch::Sender<ConsensusSnapshot>) -> Self {
        let config = consensus.config();
        let until_start = (config.start_time - chrono::Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let start = Instant::now() + until_start;

        let mut timer = RoundTimer::new(config.round_duration);
        timer.start_at(start + config.round_duration);

        Self {
            consensus,
            inbox,
            status,
            timer,
            start,
        }
    }

    /// Runs until the inbound queue closes, then hands the engine back.
    pub async fn run(mut self) -> Consensus {
        info!("Start time: {} (em {:?})", self.consensus.config().start_time, self.start - Instant::now());
        let mut proposed = false;

        loop {
            tokio::select! {
                maybe = self.inbox.recv() => match maybe {
                    Some(message) => self.handle(message),
                    None => {
                        info!("Fila de mensagens fechada, encerrando worker");
                        break;
                    }
                },

                _ = sleep_until(self.start), if !proposed => {
                    proposed = true;
                    if self.consensus.broadcast_proposal() {
                        info!("Este nó é o líder. Proposta enviada.");
                    }
                }

                _ = self.timer.expired(), if self.timer.is_running() => {
                    let directive = self.consensus.on_round_timeout();
                    debug!("on_round_timeout -> {:?}", directive);
                    self.apply(directive);
                }
            }
        }

        self.consensus
    }

    fn handle(&mut self, message: Message) {
        let directive = self.consensus.process(message);
        debug!("process_message -> {:?}", directive);
        self.apply(directive);
    }

    fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::StartTimer => {
                debug!("Starting/Restarting timer");
                self.timer.restart();
            }
            Directive::StopTimer => {
                info!(
                    "🏁 Este nó DECIDIU ({:?}). Parando timer.",
                    self.consensus.decided_value()
                );
                self.timer.stop();
            }
            _ => {}
        }
        self.publish();
    }

    fn publish(&self) {
        self.status.send_replace(self.consensus.snapshot());
    }
}
