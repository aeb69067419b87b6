//! Crypto error types.

use thiserror::Error;

/// Errors from signing and verification operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key bytes do not decode to a valid curve point.
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Signature bytes are malformed (wrong length).
    #[error("Malformed signature: expected 64 bytes, got {0}")]
    MalformedSignature(usize),

    /// Signature did not verify against the message and key.
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// No key registered for the node.
    #[error("Unknown node key")]
    UnknownNodeKey,
}
