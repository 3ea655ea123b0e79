//! End-to-end verification of a document envelope (spec.md §4.G):
//! re-walks the epoch chain, re-runs VDF verification per link, and
//! checks the signature, accumulating every failure instead of
//! short-circuiting.
//!
//! Grounded on the teacher's `Blockchain::validate_chain`
//! (`src/lib.rs`) — walk-and-accumulate block validation, relinking
//! `previousHash`, re-deriving each block's own hash — generalized from
//! a blockchain's single "is this chain valid" boolean to the spec's
//! ordered, error-collecting report shape.

use crate::chain::{compute_epoch_hash, Epoch};
use crate::envelope::Envelope;
use crate::vdf::{Vdf, VdfProof};

/// Advisory progress callback: `(percent, message)`. Errors are not
/// possible to report back; verification correctness never depends on
/// this callback being observed (spec.md §9 "Progress signalling").
pub type ProgressFn<'a> = dyn FnMut(u8, &str) + 'a;

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub verified_epochs: u64,
    pub total_epochs: u64,
    pub signature_valid: bool,
}

/// Verify an envelope's proof chain and signature (spec.md §4.G).
/// `require_signature` controls whether a missing signature is an
/// error for an otherwise-valid chain (spec.md §8 boundary case:
/// genesis alone is valid with no signature required).
pub fn verify(
    envelope: &Envelope,
    vdf: &Vdf,
    require_signature: bool,
    mut on_progress: Option<&mut ProgressFn<'_>>,
) -> VerificationReport {
    let chain = &envelope.proof_chain;
    let mut errors = Vec::new();

    let Some(genesis) = chain.first() else {
        return VerificationReport {
            valid: false,
            errors: vec!["Missing genesis epoch.".to_string()],
            verified_epochs: 0,
            total_epochs: 0,
            signature_valid: false,
        };
    };
    if !genesis.is_proper_genesis() {
        return VerificationReport {
            valid: false,
            errors: vec!["Epoch 0: Not a proper genesis.".to_string()],
            verified_epochs: 0,
            total_epochs: chain.len() as u64 - 1,
            signature_valid: false,
        };
    }

    let last_index = chain.len() - 1;
    let mut verified_epochs: u64 = 0;

    for i in 1..=last_index {
        let epoch = &chain[i];
        let previous = &chain[i - 1];
        let mut epoch_ok = true;

        if epoch.previous_hash() != Some(previous.hash()) {
            errors.push(format!("Epoch {i}: Broken chain."));
            epoch_ok = false;
        }

        if let (Some(proof), Some(iterations)) = (epoch.vdf_proof(), epoch.iterations()) {
            let own_previous_hash = epoch.previous_hash().unwrap_or_default();
            let expected_hash = compute_epoch_hash(epoch.epoch_number(), own_previous_hash, epoch.deltas(), &proof.y, iterations);
            if hex::encode(expected_hash) != epoch.hash() {
                errors.push(format!("Epoch {i}: Hash mismatch."));
                epoch_ok = false;
            }

            if !vdf.verify_proof(own_previous_hash, proof) {
                errors.push(format!("Epoch {i}: Invalid VDF proof."));
                epoch_ok = false;
            }
        } else {
            errors.push(format!("Epoch {i}: Missing VDF proof."));
            epoch_ok = false;
        }

        if epoch_ok {
            verified_epochs += 1;
        }

        if let Some(cb) = on_progress.as_deref_mut() {
            let pct = ((i as f64 / last_index as f64) * 90.0) as u8;
            cb(pct, &format!("Verifying epoch {i}…"));
        }
    }

    let signature_valid = match (envelope.metadata.signature.is_some(), envelope.metadata.public_key.is_some()) {
        (false, _) | (_, false) => {
            if require_signature {
                errors.push("Missing signature.".to_string());
            }
            false
        }
        (true, true) => match envelope.verify_signature() {
            Ok(true) => true,
            Ok(false) => {
                errors.push("Invalid signature.".to_string());
                false
            }
            Err(e) => {
                errors.push(format!("Invalid signature: {e}"));
                false
            }
        },
    };
    if let Some(cb) = on_progress.as_deref_mut() {
        cb(100, "Verification complete.");
    }

    VerificationReport {
        valid: errors.is_empty(),
        errors,
        verified_epochs,
        total_epochs: last_index as u64,
        signature_valid,
    }
}

/// Reconstruct a [`VdfProof`] from an [`Epoch`]'s own stored fields —
/// a thin convenience for callers that only have raw chain data, not an
/// envelope (e.g. the `bitquill-verify` CLI verifying a bare chain
/// export).
pub fn proof_of(epoch: &Epoch) -> Option<&VdfProof> {
    epoch.vdf_proof()
}
