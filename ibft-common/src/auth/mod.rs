//! Signature verification seam.
//!
//! Messages carry opaque signature bytes. A deployment plugs a real scheme in
//! through [`SignatureVerifier`]; [`AcceptAllSignatures`] is the stand-in used
//! until one exists.

use crate::{message::Message, registry::NodeInfo};

pub trait SignatureVerifier: Send + Sync {
    /// Checks `message.signature()` against `signer.public_key()`.
    fn verify(&self, message: &Message, signer: &NodeInfo) -> bool;
}

/// Treats every signature as valid.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllSignatures;

impl SignatureVerifier for AcceptAllSignatures {
    fn verify(&self, _message: &Message, _signer: &NodeInfo) -> bool {
        true
    }
}

/// Canonical bytes a signer should sign: the message JSON with the signature stripped.
pub fn signing_bytes(message: &Message) -> Vec<u8> {
    let unsigned = message.clone().with_signature(Vec::new());
    // A Message always serializes.
    serde_json::to_vec(&unsigned).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn test_accept_all() {
        let node = NodeInfo::new(0, 1, vec![1, 2, 3]).unwrap();
        let msg = Message::prepare(1, 0, Value::Int(2)).with_signature(vec![9; 64]);
        assert!(msg.verify_signature(&AcceptAllSignatures, &node));
    }

    #[test]
    fn test_signing_bytes_ignore_signature() {
        let a = Message::commit(4, 2, Value::Int(8));
        let b = a.clone().with_signature(vec![7; 64]);
        assert_eq!(signing_bytes(&a), signing_bytes(&b));
        assert_ne!(signing_bytes(&a), signing_bytes(&Message::commit(4, 2, Value::Int(10))));
    }
}
