//! The epoch chain manager (spec.md §4.D): genesis, append, calibration
//! adjustment, and cold-start iteration bootstrap.
//!
//! Grounded on the teacher's `Timechain` (`src/chain.rs`): the
//! genesis-anchor check in `Timechain::new`, and the proportional
//! clamp-adjustment shape of `adjust_difficulty` (reused here for
//! `adjust_iterations`'s banded adjustment), plus `VDF::calibrate`
//! (`src/consensus/vdf.rs`) for the cold-start bootstrap recipe.

use crate::config::ObserverConfig;
use crate::delta::EditDeltaGroup;
use crate::error::ChainError;
use crate::vdf::{Vdf, VdfProof};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// The fixed genesis hash: 64 hex zeros, i.e. a 32-byte all-zero digest
/// (spec.md §3 Epoch invariants).
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenesisEpoch {
    pub epoch_number: u64,
    pub hash: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedEpoch {
    pub epoch_number: u64,
    pub previous_hash: String,
    pub deltas: Vec<EditDeltaGroup>,
    pub vdf_proof: VdfProof,
    pub iterations: u64,
    pub epoch_duration: f64,
    pub timestamp: String,
    pub hash: String,
}

/// One sealed interval of the writing timeline (spec.md §3 `Epoch`).
/// Genesis and non-genesis epochs carry different fields (see the file
/// format in spec.md §6), so they are modeled as distinct JSON shapes
/// rather than one struct full of `Option`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Epoch {
    Genesis(GenesisEpoch),
    Sealed(SealedEpoch),
}

impl Epoch {
    pub fn epoch_number(&self) -> u64 {
        match self {
            Epoch::Genesis(g) => g.epoch_number,
            Epoch::Sealed(s) => s.epoch_number,
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            Epoch::Genesis(g) => &g.hash,
            Epoch::Sealed(s) => &s.hash,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            Epoch::Genesis(g) => &g.timestamp,
            Epoch::Sealed(s) => &s.timestamp,
        }
    }

    pub fn previous_hash(&self) -> Option<&str> {
        match self {
            Epoch::Genesis(_) => None,
            Epoch::Sealed(s) => Some(&s.previous_hash),
        }
    }

    pub fn deltas(&self) -> &[EditDeltaGroup] {
        match self {
            Epoch::Genesis(_) => &[],
            Epoch::Sealed(s) => &s.deltas,
        }
    }

    pub fn vdf_proof(&self) -> Option<&VdfProof> {
        match self {
            Epoch::Genesis(_) => None,
            Epoch::Sealed(s) => Some(&s.vdf_proof),
        }
    }

    pub fn epoch_duration(&self) -> Option<f64> {
        match self {
            Epoch::Genesis(_) => None,
            Epoch::Sealed(s) => Some(s.epoch_duration),
        }
    }

    pub fn iterations(&self) -> Option<u64> {
        match self {
            Epoch::Genesis(_) => None,
            Epoch::Sealed(s) => Some(s.iterations),
        }
    }

    pub fn is_proper_genesis(&self) -> bool {
        matches!(self, Epoch::Genesis(g) if g.epoch_number == 0 && g.hash == GENESIS_HASH)
    }
}

/// Re-derive an epoch's hash from its own fields (spec.md §3 invariant,
/// §4.C key order `epochNumber, previousHash, deltas, vdfY, iterations`).
pub fn compute_epoch_hash(
    epoch_number: u64,
    previous_hash: &str,
    deltas: &[EditDeltaGroup],
    vdf_y: &BigUint,
    iterations: u64,
) -> [u8; 32] {
    use crate::canonical::CanonicalValue;

    let deltas_value = CanonicalValue::Array(
        deltas
            .iter()
            .map(|d| CanonicalValue::object(vec![("ops", CanonicalValue::from_json(&d.ops))]))
            .collect(),
    );
    let value = CanonicalValue::object(vec![
        ("epochNumber", CanonicalValue::UInt(epoch_number)),
        ("previousHash", CanonicalValue::Str(previous_hash.to_string())),
        ("deltas", deltas_value),
        ("vdfY", CanonicalValue::Str(crate::bigint::to_hex(vdf_y))),
        ("iterations", CanonicalValue::UInt(iterations)),
    ]);
    value.hash()
}

/// Supplies the current time as an ISO-8601 string, injectable so tests
/// can pin it (the teacher favors small, independently testable value
/// types; see `Reputation`/`PeerState` in `src/network/peer_manager.rs`).
pub trait Clock: Send + Sync {
    fn now_iso8601(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_iso8601(&self) -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

pub struct EpochChain<C: Clock = SystemClock> {
    epochs: Vec<Epoch>,
    clock: C,
}

impl EpochChain<SystemClock> {
    pub fn new() -> Self {
        Self { epochs: Vec::new(), clock: SystemClock }
    }
}

impl Default for EpochChain<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> EpochChain<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { epochs: Vec::new(), clock }
    }

    /// Reset the chain to a fresh genesis, clearing any pending buffer
    /// state that lives above this manager (spec.md §4.D `genesis()`).
    pub fn genesis(&mut self) {
        self.epochs = vec![Epoch::Genesis(GenesisEpoch {
            epoch_number: 0,
            hash: GENESIS_HASH.to_string(),
            timestamp: self.clock.now_iso8601(),
        })];
        debug!("epoch chain reset to genesis");
    }

    pub fn current_tip(&self) -> Result<&Epoch, ChainError> {
        self.epochs.last().ok_or(ChainError::NoGenesis)
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    /// Append the next sealed epoch. Rejects empty-delta epochs
    /// (spec.md §4.D: "no-op epochs are silently skipped by the
    /// session"; the chain itself enforces it as an invariant).
    pub fn append(
        &mut self,
        deltas: Vec<EditDeltaGroup>,
        proof: VdfProof,
        iterations: u64,
        duration: f64,
    ) -> Result<&Epoch, ChainError> {
        if deltas.is_empty() {
            return Err(ChainError::EmptyDeltas);
        }
        let tip = self.current_tip()?;
        let next_number = tip.epoch_number() + 1;
        let previous_hash = tip.hash().to_string();

        let hash = compute_epoch_hash(next_number, &previous_hash, &deltas, &proof.y, iterations);
        let sealed = SealedEpoch {
            epoch_number: next_number,
            previous_hash,
            deltas,
            vdf_proof: proof,
            iterations,
            epoch_duration: duration,
            timestamp: self.clock.now_iso8601(),
            hash: hex::encode(hash),
        };
        debug!(epoch = next_number, "epoch sealed");
        self.epochs.push(Epoch::Sealed(sealed));
        Ok(self.epochs.last().expect("just pushed"))
    }
}

/// Proportional, banded adjustment of the iteration count toward the
/// target epoch duration (spec.md §4.D `adjust_iterations`), the same
/// clamp-then-smooth shape as the teacher's `adjust_difficulty`.
pub fn adjust_iterations(last_duration: f64, target: f64, current_iters: u64) -> u64 {
    if (last_duration - target).abs() > 0.2 * target {
        let new_iters = (current_iters as f64 * target / last_duration).floor();
        ((current_iters as f64 + new_iters) / 2.0).floor() as u64
    } else {
        current_iters
    }
}

/// Cold-start calibration (spec.md §4.D): run one VDF at
/// `config.calibration_iterations`, measure wall time, derive
/// iterations/second, and scale to `config.target_epoch_seconds`.
/// Falls back to `config.fallback_iterations` if the calibration run
/// itself fails.
pub fn cold_start_calibration(vdf: &Vdf, config: &ObserverConfig) -> u64 {
    let start = Instant::now();
    match vdf.compute_proof(GENESIS_HASH, config.calibration_iterations, None) {
        Ok(_) => {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed <= 0.0 {
                return config.fallback_iterations;
            }
            let rate = config.calibration_iterations as f64 / elapsed;
            ((rate * config.target_epoch_seconds).round().max(1.0)) as u64
        }
        Err(e) => {
            warn!(error = %e, "cold-start calibration failed, using fallback iteration count");
            config.fallback_iterations
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small_vdf() -> Vdf {
        Vdf::new(BigUint::from(2088769923527729741573924049279569u128)).unwrap()
    }

    fn group(text: &str) -> EditDeltaGroup {
        EditDeltaGroup::new(json!([{"insert": text}]))
    }

    #[test]
    fn genesis_hash_is_64_zero_hex_chars() {
        assert_eq!(GENESIS_HASH.len(), 64);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }

    #[test]
    fn genesis_then_append_builds_linked_chain() {
        let vdf = small_vdf();
        let mut chain = EpochChain::new();
        chain.genesis();
        assert!(chain.current_tip().unwrap().is_proper_genesis());

        for i in 0..3 {
            let tip_hash = chain.current_tip().unwrap().hash().to_string();
            let proof = vdf.compute_proof(&tip_hash, 50, None).unwrap();
            chain.append(vec![group(&format!("chunk-{i}"))], proof, 50, 1.0).unwrap();
        }

        let epochs = chain.epochs();
        assert_eq!(epochs.len(), 4);
        for i in 1..epochs.len() {
            assert_eq!(epochs[i].previous_hash().unwrap(), epochs[i - 1].hash());
            assert_eq!(epochs[i].epoch_number(), i as u64);
        }
    }

    #[test]
    fn append_rejects_empty_deltas() {
        let vdf = small_vdf();
        let mut chain = EpochChain::new();
        chain.genesis();
        let proof = vdf.compute_proof(GENESIS_HASH, 10, None).unwrap();
        let err = chain.append(vec![], proof, 10, 1.0).unwrap_err();
        assert!(matches!(err, ChainError::EmptyDeltas));
    }

    #[test]
    fn recomputed_hash_matches_stored_hash() {
        let vdf = small_vdf();
        let mut chain = EpochChain::new();
        chain.genesis();
        let proof = vdf.compute_proof(GENESIS_HASH, 10, None).unwrap();
        let deltas = vec![group("a")];
        let sealed = chain.append(deltas.clone(), proof.clone(), 10, 1.0).unwrap().clone();
        let recomputed = compute_epoch_hash(1, GENESIS_HASH, &deltas, &proof.y, 10);
        assert_eq!(sealed.hash(), hex::encode(recomputed));
    }

    #[test]
    fn adjust_iterations_out_of_band_averages_down() {
        // S4 first case.
        assert_eq!(adjust_iterations(20.0, 10.0, 100_000), 75_000);
    }

    #[test]
    fn adjust_iterations_within_band_is_unchanged() {
        // S4 second case.
        assert_eq!(adjust_iterations(10.1, 10.0, 100_000), 100_000);
    }

    #[test]
    fn cold_start_calibration_produces_a_positive_target() {
        let vdf = small_vdf();
        let config = ObserverConfig {
            target_epoch_seconds: 0.05,
            calibration_iterations: 200,
            fallback_iterations: 500,
            modulus_hex: None,
        };
        let iters = cold_start_calibration(&vdf, &config);
        assert!(iters > 0);
    }
}
