//! consensus
//!
//! Istanbul BFT state machine.
//!
//! A [`Consensus`] instance owns the round state and the [`store::RoundStore`]
//! of one node. It is driven from outside by exactly two entry points,
//! [`Consensus::process`] for inbound messages and
//! [`Consensus::on_round_timeout`] for timer expiry, and it assumes the
//! caller serializes them: there is no locking inside.
//!
//! Outbound messages go through the [`crate::ports::Broadcaster`] handed in at
//! construction; what to do with the round timer is returned as a
//! [`state::Directive`].

pub mod config;
mod engine;
pub mod evaluator;
pub mod state;
pub mod store;
mod transitions;
pub mod validation;

pub use engine::Consensus;
