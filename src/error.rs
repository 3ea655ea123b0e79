//! Typed error families for each subsystem, thiserror-derived.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BigIntError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    #[error("modulus must be nonzero")]
    ZeroModulus,
}

#[derive(Debug, Error)]
pub enum VdfError {
    #[error(transparent)]
    BigInt(#[from] BigIntError),
    #[error("input must be valid UTF-8 / hex: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("cannot append an epoch with no deltas")]
    EmptyDeltas,
    #[error("chain has no genesis epoch")]
    NoGenesis,
    #[error("epoch numbers must increase by exactly 1, got {prev} -> {next}")]
    NonSequential { prev: u64, next: u64 },
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("missing field required for signing: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Signing(#[from] p384::ecdsa::Error),
    #[error("public key is not a valid P-384 JWK: {0}")]
    InvalidJwk(String),
    #[error("signature is not 96 bytes (r || s)")]
    InvalidSignatureLength,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("VDF computation failed: {0}")]
    ComputationFailed(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decryption failed — wrong key or corrupted ciphertext")]
    DecryptionFailed,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("quota exceeded while saving")]
    QuotaExceeded,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid target epoch duration: {0}")]
    InvalidEpochDuration(String),
    #[error("invalid modulus: {0}")]
    InvalidModulus(#[from] BigIntError),
}
