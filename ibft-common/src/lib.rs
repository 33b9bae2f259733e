//! Shared types for the IBFT workspace.
//!
//! Everything that crosses a process boundary lives here: the node registry,
//! the proposal [`Value`], and the consensus [`Message`] with its JSON codec.

pub mod auth;
pub mod message;
pub mod registry;
pub mod value;

/// Round number. Rounds start at 1.
pub type Round = u64;
/// Index of a node inside the [`registry::NodeRegistry`].
pub type NodeIndex = u64;
/// Voting weight of a node.
pub type Weight = u64;

pub use auth::{AcceptAllSignatures, SignatureVerifier};
pub use message::{Message, MessageError, MessageKey, MessageType, Payload};
pub use registry::{NodeInfo, NodeRegistry, RegistryError};
pub use value::Value;
