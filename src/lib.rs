//! Cryptographic core of a tamper-evident, VDF-timestamped authorship
//! ledger: a Wesolowski VDF chain binds real wall-clock time to an
//! editing session's history; a signed document envelope carries that
//! chain plus content; an offline verifier and an authorship analyzer
//! read the result back.

pub mod analyzer;
pub mod bigint;
pub mod canonical;
pub mod chain;
pub mod config;
pub mod delta;
pub mod envelope;
pub mod error;
pub mod keystore;
pub mod session;
pub mod storage;
pub mod vdf;
pub mod verifier;

pub use chain::{Epoch, EpochChain};
pub use config::ObserverConfig;
pub use envelope::Envelope;
pub use error::{BigIntError, ChainError, ConfigError, EnvelopeError, SessionError, StorageError, VdfError};
pub use session::EditingSession;
pub use vdf::{Vdf, VdfProof};
pub use verifier::VerificationReport;

/// The crate version, for the `version()` external-interface call
/// (spec.md §6 "Benchmark / version calls").
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
