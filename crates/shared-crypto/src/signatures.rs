//! # Federation Signatures
//!
//! Ed25519 node identities and the peer keyring backing message
//! verification.
//!
//! ## Security Properties
//!
//! - Deterministic nonces (no RNG dependency at signing time)
//! - A node's [`shared_types::NodeId`] IS its verifying key, so the keyring
//!   can reject any key/id mismatch at registration time
//! - Secret key material is zeroized on drop

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::RwLock;
use shared_types::NodeId;
use std::collections::HashMap;
use zeroize::Zeroize;

/// The signing/verification capability the federation layer depends on.
///
/// Implementations must be cheap to call concurrently; verification happens
/// on the gossip receive path.
pub trait SignatureCapability: Send + Sync {
    /// Sign bytes with this node's identity.
    fn sign(&self, message: &[u8]) -> Vec<u8>;

    /// Verify bytes against a peer's registered key.
    ///
    /// Returns `false` for unknown peers, malformed signatures, and
    /// verification failures alike; callers drop and count, they do not
    /// distinguish.
    fn verify(&self, message: &[u8], signature: &[u8], node_id: NodeId) -> bool;

    /// This node's identity (its verifying key bytes).
    fn local_node_id(&self) -> NodeId;
}

/// This node's Ed25519 identity.
pub struct Ed25519Identity {
    signing_key: SigningKey,
}

impl Ed25519Identity {
    /// Generate a random identity.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Restore an identity from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// The node id derived from this identity's verifying key.
    pub fn node_id(&self) -> NodeId {
        NodeId::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic, no RNG needed).
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Secret seed for persistence.
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Drop for Ed25519Identity {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

/// Registry of peer verifying keys.
///
/// Since a [`NodeId`] is the verifying key bytes, registration validates
/// that the bytes decode to a real curve point and verification needs no
/// separate key store lookup failure mode beyond "unknown peer".
#[derive(Default)]
pub struct PeerKeyring {
    keys: RwLock<HashMap<NodeId, VerifyingKey>>,
}

impl PeerKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. Rejects ids that are not valid verifying keys.
    pub fn register(&self, node_id: NodeId) -> Result<(), CryptoError> {
        let key = VerifyingKey::from_bytes(node_id.as_bytes())
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        self.keys.write().insert(node_id, key);
        Ok(())
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.keys.read().contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Verify a signature from a registered peer.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        node_id: NodeId,
    ) -> Result<(), CryptoError> {
        let keys = self.keys.read();
        let key = keys.get(&node_id).ok_or(CryptoError::UnknownNodeKey)?;

        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| CryptoError::MalformedSignature(signature.len()))?;
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

        key.verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Default [`SignatureCapability`]: local Ed25519 identity plus peer keyring.
pub struct NodeSigner {
    identity: Ed25519Identity,
    keyring: PeerKeyring,
}

impl NodeSigner {
    pub fn new(identity: Ed25519Identity) -> Self {
        Self {
            identity,
            keyring: PeerKeyring::new(),
        }
    }

    pub fn keyring(&self) -> &PeerKeyring {
        &self.keyring
    }
}

impl SignatureCapability for NodeSigner {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.identity.sign(message).to_vec()
    }

    fn verify(&self, message: &[u8], signature: &[u8], node_id: NodeId) -> bool {
        self.keyring.verify(message, signature, node_id).is_ok()
    }

    fn local_node_id(&self) -> NodeId {
        self.identity.node_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let identity = Ed25519Identity::generate();
        let node_id = identity.node_id();
        let message = b"closed incident digest batch";

        let signature = identity.sign(message);

        let keyring = PeerKeyring::new();
        keyring.register(node_id).unwrap();
        assert!(keyring.verify(message, &signature, node_id).is_ok());
    }

    #[test]
    fn test_tampered_message_rejected() {
        let identity = Ed25519Identity::generate();
        let node_id = identity.node_id();

        let signature = identity.sign(b"original");

        let keyring = PeerKeyring::new();
        keyring.register(node_id).unwrap();
        assert_eq!(
            keyring.verify(b"tampered", &signature, node_id),
            Err(CryptoError::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_unknown_peer_rejected() {
        let identity = Ed25519Identity::generate();
        let signature = identity.sign(b"message");

        let keyring = PeerKeyring::new();
        assert_eq!(
            keyring.verify(b"message", &signature, identity.node_id()),
            Err(CryptoError::UnknownNodeKey)
        );
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let identity = Ed25519Identity::generate();
        let node_id = identity.node_id();

        let keyring = PeerKeyring::new();
        keyring.register(node_id).unwrap();
        assert_eq!(
            keyring.verify(b"message", &[0u8; 10], node_id),
            Err(CryptoError::MalformedSignature(10))
        );
    }

    #[test]
    fn test_garbage_node_id_rejected_at_registration() {
        // Not every 32-byte string is a valid curve point; this one is not.
        let keyring = PeerKeyring::new();
        let mut attempts = 0;
        loop {
            let bytes: [u8; 32] = rand::random();
            if VerifyingKey::from_bytes(&bytes).is_err() {
                assert_eq!(
                    keyring.register(NodeId::new(bytes)),
                    Err(CryptoError::InvalidPublicKey)
                );
                break;
            }
            attempts += 1;
            assert!(attempts < 64, "could not find an invalid point");
        }
    }

    #[test]
    fn test_node_signer_capability() {
        let alice = Ed25519Identity::generate();
        let bob = Ed25519Identity::generate();
        let bob_id = bob.node_id();

        let signer = NodeSigner::new(alice);
        signer.keyring().register(bob_id).unwrap();

        let message = b"gossip payload";
        let bob_sig = bob.sign(message);

        assert!(signer.verify(message, &bob_sig, bob_id));
        assert!(!signer.verify(b"other payload", &bob_sig, bob_id));
    }

    #[test]
    fn test_seed_restores_identity() {
        let identity = Ed25519Identity::generate();
        let seed = identity.to_seed();
        let restored = Ed25519Identity::from_seed(seed);

        assert_eq!(identity.node_id(), restored.node_id());
        assert_eq!(identity.sign(b"x"), restored.sign(b"x"));
    }
}
