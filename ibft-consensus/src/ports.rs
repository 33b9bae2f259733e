use ibft_common::Message;

/// Outbound side of the engine.
///
/// Delivery is best effort: an implementation must return promptly and must
/// not report peer failures back into the state machine.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, message: &Message);
}

/// Drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBroadcaster;

impl Broadcaster for NullBroadcaster {
    fn broadcast(&self, _message: &Message) {}
}
