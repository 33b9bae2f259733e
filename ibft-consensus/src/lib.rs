pub mod consensus;
pub mod hooks;
pub mod ports;

pub use consensus::{
    config::{ConsensusConfig, LeaderPolicy, PreparedPairCheck},
    evaluator::{QuorumPolicy, Thresholds},
    state::{ConsensusPhase, ConsensusSnapshot, Directive, QuorumKind},
    store::RoundStore,
    validation::ValidationError,
    Consensus,
};
pub use hooks::{EvenValue, FixedValue, ValueStrategy};
pub use ports::{Broadcaster, NullBroadcaster};
