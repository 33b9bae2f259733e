#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use ibft_common::{Message, MessageType, NodeRegistry, Round};
use ibft_consensus::{Broadcaster, Consensus, ConsensusConfig, ConsensusPhase, Directive, EvenValue};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Records everything an engine broadcasts.
#[derive(Default)]
pub struct MockBroadcaster {
    sent: Mutex<Vec<Message>>,
}

impl Broadcaster for MockBroadcaster {
    fn broadcast(&self, message: &Message) {
        self.sent.lock().unwrap().push(message.clone());
    }
}

impl MockBroadcaster {
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

/// One engine wired to a recording broadcaster.
pub fn single_node(n: usize, id: u64, configure: impl Fn(ConsensusConfig) -> ConsensusConfig) -> (Consensus, Arc<MockBroadcaster>) {
    let out = Arc::new(MockBroadcaster::default());
    let config = configure(ConsensusConfig::new(NodeRegistry::uniform(n).unwrap(), Some(id)));
    (Consensus::new(config, Arc::new(EvenValue), out.clone()), out)
}

/// Processed step, for assertions on directives.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub to: usize,
    pub message: Message,
    pub directive: Directive,
}

/// In-memory network of engines. Every broadcast reaches every node,
/// the sender included, in FIFO order or shuffled with a seeded RNG.
pub struct Network {
    pub nodes: Vec<Consensus>,
    outboxes: Vec<Arc<MockBroadcaster>>,
    queue: VecDeque<(usize, Message)>,
    silent: HashSet<usize>,
    dropped: HashSet<MessageType>,
    rng: Option<StdRng>,
    last_round: Vec<Round>,
    pub log: Vec<Delivery>,
}

impl Network {
    pub fn new(n: usize) -> Self {
        Self::with_config(n, |c| c)
    }

    pub fn with_config(n: usize, configure: impl Fn(ConsensusConfig) -> ConsensusConfig) -> Self {
        let (nodes, outboxes): (Vec<_>, Vec<_>) = (0..n).map(|i| single_node(n, i as u64, &configure)).unzip();
        Self {
            nodes,
            outboxes,
            queue: VecDeque::new(),
            silent: HashSet::new(),
            dropped: HashSet::new(),
            rng: None,
            last_round: vec![1; n],
            log: Vec::new(),
        }
    }

    pub fn shuffled(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// Messages sent by `node` are lost from now on.
    pub fn silence(&mut self, node: usize) {
        self.silent.insert(node);
    }

    /// Messages of `kind` are lost until [`Network::restore`].
    pub fn drop_kind(&mut self, kind: MessageType) {
        self.dropped.insert(kind);
    }

    pub fn restore(&mut self) {
        self.dropped.clear();
    }

    /// Queues a crafted message for a single node.
    pub fn inject(&mut self, to: usize, message: Message) {
        self.queue.push_back((to, message));
    }

    pub fn start(&mut self) {
        for node in &mut self.nodes {
            node.broadcast_proposal();
        }
        self.collect();
    }

    pub fn timeout(&mut self, node: usize) {
        self.nodes[node].on_round_timeout();
        self.check_invariants(node);
        self.collect();
    }

    pub fn timeout_undecided(&mut self) {
        for i in 0..self.nodes.len() {
            if !self.nodes[i].is_decided() {
                self.timeout(i);
            }
        }
    }

    /// Delivers until nothing is in flight.
    pub fn run(&mut self) {
        let mut steps = 0;
        while let Some((to, message)) = self.next() {
            steps += 1;
            assert!(steps < 100_000, "network did not quiesce");

            let directive = self.nodes[to].process(message.clone());
            self.log.push(Delivery { to, message, directive });
            self.check_invariants(to);
            self.collect();
        }
    }

    pub fn decided_values(&self) -> Vec<Option<ibft_common::Value>> {
        self.nodes.iter().map(|n| n.decided_value().cloned()).collect()
    }

    pub fn all_decided(&self) -> bool {
        self.nodes.iter().all(Consensus::is_decided)
    }

    pub fn sent_by(&self, node: usize) -> Vec<&Message> {
        let mut seen = HashSet::new();
        self.log
            .iter()
            .map(|d| &d.message)
            .filter(|m| m.sender() == node as u64)
            .filter(|m| seen.insert(m.key()))
            .collect()
    }

    fn next(&mut self) -> Option<(usize, Message)> {
        match self.rng.as_mut() {
            Some(rng) if !self.queue.is_empty() => {
                let pick = rng.gen_range(0..self.queue.len());
                self.queue.remove(pick)
            }
            _ => self.queue.pop_front(),
        }
    }

    fn collect(&mut self) {
        for (from, outbox) in self.outboxes.iter().enumerate() {
            for message in outbox.take() {
                if self.silent.contains(&from) || self.dropped.contains(&message.kind()) {
                    continue;
                }
                for to in 0..self.nodes.len() {
                    self.queue.push_back((to, message.clone()));
                }
            }
        }
    }

    fn check_invariants(&mut self, node: usize) {
        let snap = self.nodes[node].snapshot();
        assert!(snap.round >= self.last_round[node], "node {node} round went backwards");
        assert!(snap.prepared_round <= snap.round, "node {node} prepared ahead of its round");
        if snap.state == ConsensusPhase::Decided {
            assert!(snap.decided_value.is_some());
        }
        self.last_round[node] = snap.round;
    }
}
