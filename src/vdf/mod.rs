//! Wesolowski-style VDF engine: repeated squaring in an RSA group of
//! unknown order, proof generation, proof verification, and iteration
//! calibration (spec.md §4.B).
//!
//! Adapted from the teacher's `src/consensus/vdf.rs` `VDF`/`VDFProof`:
//! the squaring loop, progress-logging cadence, and Miller-Rabin-backed
//! hash-to-prime challenge are carried over, generalized to the spec's
//! explicit `(y, pi, l, r, iterations)` proof shape with `r` produced by
//! the incremental-doubling accumulator spec.md §4.B step 2 prescribes
//! (rather than a single huge division, which the teacher's simpler
//! `generate_proof` used).

mod hash_to_prime;

use crate::bigint;
use crate::error::VdfError;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// The RSA-2048 challenge number: a 2048-bit semiprime whose
/// factorization is unknown. Security of the VDF rests on this modulus
/// having unknown order (spec.md §1, §3).
static RSA_2048_DEFAULT: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(
        b"25195908475657893494027183240048398571429282126204032027777137836043662020707595556264018525880784406918290641249515082189298559149176184502808489120072844992687392807287776735971418347270261896375014971824691165077613379859095700097330459748808428401797429100642458691817195118746121515172654632282216869987549182422433637259085141865462043576798423387184774447920739934236584823824281198163815010674810451660377306056201619676256133844143603833904414952634432190114657544454178424020924616515723350778707749817125772467962926386356373289912154831438167899885040445364023527381951378636564391212010397122822120720357",
        10,
    )
    .expect("RSA-2048 modulus literal is valid")
});

/// The default modulus for a fresh VDF instance.
pub fn rsa_2048_modulus() -> BigUint {
    RSA_2048_DEFAULT.clone()
}

/// A sealed Wesolowski proof (spec.md §3 `VDFProof`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdfProof {
    #[serde(with = "biguint_hex")]
    pub y: BigUint,
    #[serde(with = "biguint_hex")]
    pub pi: BigUint,
    #[serde(with = "biguint_hex")]
    pub l: BigUint,
    #[serde(with = "biguint_hex")]
    pub r: BigUint,
    pub iterations: u64,
}

/// `serde(with = ...)` helper serializing a `BigUint` as lowercase hex,
/// matching spec.md §3's "all integers serialized as lowercase
/// hexadecimal without prefix".
mod biguint_hex {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::bigint::to_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::bigint::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A progress callback. Returning `Err` is swallowed — progress
/// reporting is advisory and must never abort a sealing in progress
/// (spec.md §4.B Failure semantics, §9 "Progress signalling").
pub type ProgressFn<'a> = dyn FnMut(u8) -> Result<(), String> + 'a;

pub struct Vdf {
    pub modulus: BigUint,
    calibrated_iters_per_sec: RwLock<Option<f64>>,
}

impl Vdf {
    pub fn new(modulus: BigUint) -> Result<Self, VdfError> {
        if modulus.is_zero() {
            return Err(VdfError::BigInt(crate::error::BigIntError::ZeroModulus));
        }
        Ok(Self { modulus, calibrated_iters_per_sec: RwLock::new(None) })
    }

    pub fn with_default_modulus() -> Self {
        Self::new(rsa_2048_modulus()).expect("default modulus is nonzero")
    }

    /// Map `input_hex` to a group element (spec.md §4.B): UTF-8 bytes of
    /// the string, SHA-256, big-endian integer mod N, with 0/1 replaced
    /// by 2 to avoid trivial fixed points.
    fn derive_x(&self, input_hex: &str) -> BigUint {
        let mut hasher = Sha256::new();
        hasher.update(input_hex.as_bytes());
        let digest = hasher.finalize();
        let x = BigUint::from_bytes_be(&digest) % &self.modulus;
        if x.is_zero() || x == BigUint::one() {
            BigUint::from(2u32)
        } else {
            x
        }
    }

    /// Compute `y = x^(2^T) mod N` by `T` sequential squarings, plus its
    /// Wesolowski proof.
    pub fn compute_proof(
        &self,
        input_hex: &str,
        iterations: u64,
        mut on_progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<VdfProof, VdfError> {
        let x = self.derive_x(input_hex);

        if iterations == 0 {
            // spec.md §4.B Failure semantics: the degenerate fixed proof.
            return Ok(VdfProof {
                y: x,
                pi: BigUint::one(),
                l: BigUint::from(3u32),
                r: BigUint::one(),
                iterations: 0,
            });
        }

        debug!(iterations, "VDF: starting sequential squaring");
        let start = Instant::now();
        let progress_step = (iterations / 100).max(1);

        let mut y = x.clone();
        for i in 0..iterations {
            y = (&y * &y) % &self.modulus;

            if i % progress_step == 0 {
                if let Some(cb) = on_progress.as_deref_mut() {
                    let pct = ((i as f64 / iterations as f64) * 100.0) as u8;
                    let _ = cb(pct);
                }
            }
        }
        if let Some(cb) = on_progress.as_deref_mut() {
            let _ = cb(100);
        }
        trace!(elapsed_ms = start.elapsed().as_millis() as u64, "VDF: squaring complete");

        let l = hash_to_prime::hash_to_prime(&x, &y);
        let (q, r) = compute_q_r(&l, iterations);
        let pi = bigint::mod_pow(&x, &q, &self.modulus)?;

        Ok(VdfProof { y, pi, l, r, iterations })
    }

    /// Verify a Wesolowski proof: cheap, independent of `iterations`
    /// (spec.md §4.B, §4.G performance note).
    pub fn verify_proof(&self, input_hex: &str, proof: &VdfProof) -> bool {
        let x = self.derive_x(input_hex);

        if proof.iterations == 0 {
            return proof.y == x
                && proof.pi == BigUint::one()
                && proof.l == BigUint::from(3u32)
                && proof.r == BigUint::one();
        }

        let expected_l = hash_to_prime::hash_to_prime(&x, &proof.y);
        if expected_l != proof.l {
            return false;
        }
        if proof.r >= proof.l {
            return false;
        }

        let two = BigUint::from(2u32);
        let expected_r = two.modpow(&BigUint::from(proof.iterations), &proof.l);
        if expected_r != proof.r {
            return false;
        }

        let lhs = match bigint::mod_pow(&proof.pi, &proof.l, &self.modulus) {
            Ok(v) => v,
            Err(_) => return false,
        };
        let rhs_factor = match bigint::mod_pow(&x, &proof.r, &self.modulus) {
            Ok(v) => v,
            Err(_) => return false,
        };
        let lhs = (lhs * rhs_factor) % &self.modulus;

        lhs == proof.y
    }

    /// Run squarings for approximately `duration_ms`, return measured
    /// throughput in iterations/second (spec.md §4.B `benchmark`).
    pub fn benchmark(&self, duration_ms: u64) -> f64 {
        let mut x = self.derive_x("bitquill-vdf-benchmark-probe");
        let budget = Duration::from_millis(duration_ms);
        let start = Instant::now();
        let mut count: u64 = 0;
        while start.elapsed() < budget {
            x = (&x * &x) % &self.modulus;
            count += 1;
        }
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            count as f64 / elapsed
        } else {
            count as f64
        }
    }

    /// Estimate the iteration count for `seconds` of wall-clock work,
    /// bootstrapping the iterations/second rate from a short benchmark
    /// run on first use and caching it thereafter (spec.md §4.B).
    pub fn estimate_iterations_for_seconds(&self, seconds: f64) -> u64 {
        let rate = {
            let cached = *self.calibrated_iters_per_sec.read().expect("lock poisoned");
            cached
        };
        let rate = match rate {
            Some(r) => r,
            None => {
                let measured = self.benchmark(200);
                *self.calibrated_iters_per_sec.write().expect("lock poisoned") = Some(measured);
                measured
            }
        };
        ((rate * seconds).round().max(1.0)) as u64
    }
}

/// Compute `q = floor(2^T / l)` and `r = 2^T mod l` by repeated doubling
/// (spec.md §4.B step 2): `O(T)` big-int doublings on operands bounded
/// by `l`'s and `q`'s own bit length, rather than materializing `2^T`
/// directly and dividing it — the squaring loop already dominates cost.
fn compute_q_r(l: &BigUint, iterations: u64) -> (BigUint, BigUint) {
    let two = BigUint::from(2u32);
    let mut q = BigUint::zero();
    let mut r = BigUint::one();
    for _ in 0..iterations {
        let doubled = &r * &two;
        if &doubled >= l {
            r = &doubled - l;
            q = &q * &two + BigUint::one();
        } else {
            r = doubled;
            q = &q * &two;
        }
    }
    (q, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_vdf() -> Vdf {
        // A small modulus keeps unit tests fast; correctness of the
        // Wesolowski relation does not depend on modulus size.
        Vdf::new(BigUint::from(2088769923527729741573924049279569u128)).unwrap()
    }

    #[test]
    fn compute_then_verify_round_trip() {
        let vdf = small_vdf();
        for iterations in [0u64, 1, 10, 1000] {
            let proof = vdf.compute_proof("abc", iterations, None).unwrap();
            assert!(vdf.verify_proof("abc", &proof), "T={iterations} should verify");
        }
    }

    #[test]
    fn tampered_y_fails_verification() {
        let vdf = small_vdf();
        let mut proof = vdf.compute_proof("abc", 1024, None).unwrap();
        proof.y += BigUint::one();
        assert!(!vdf.verify_proof("abc", &proof));
    }

    #[test]
    fn tampered_pi_fails_verification() {
        let vdf = small_vdf();
        let mut proof = vdf.compute_proof("abc", 1024, None).unwrap();
        proof.pi += BigUint::one();
        assert!(!vdf.verify_proof("abc", &proof));
    }

    #[test]
    fn zero_iterations_has_fixed_shape() {
        let vdf = small_vdf();
        let proof = vdf.compute_proof("xyz", 0, None).unwrap();
        assert_eq!(proof.pi, BigUint::one());
        assert_eq!(proof.l, BigUint::from(3u32));
        assert_eq!(proof.r, BigUint::one());
        assert!(vdf.verify_proof("xyz", &proof));
    }

    #[test]
    fn determinism_s1() {
        let vdf = small_vdf();
        let p1 = vdf.compute_proof("abc", 1024, None).unwrap();
        let p2 = vdf.compute_proof("abc", 1024, None).unwrap();
        assert_eq!(p1, p2);
        assert!(vdf.verify_proof("abc", &p1));

        let mut tampered = p1.clone();
        // Perturb the low-order nibble of y.
        tampered.y += BigUint::from(1u8);
        assert!(!vdf.verify_proof("abc", &tampered));
    }

    #[test]
    fn progress_callback_reaches_100_and_errors_are_swallowed() {
        let vdf = small_vdf();
        let mut seen = Vec::new();
        let mut cb = |pct: u8| -> Result<(), String> {
            seen.push(pct);
            Err("progress sinks are allowed to fail".to_string())
        };
        let proof = vdf.compute_proof("abc", 200, Some(&mut cb)).unwrap();
        assert!(vdf.verify_proof("abc", &proof));
        assert!(seen.contains(&100));
    }

    #[test]
    fn benchmark_reports_positive_rate() {
        let vdf = small_vdf();
        let rate = vdf.benchmark(20);
        assert!(rate > 0.0);
    }

    #[test]
    fn estimate_iterations_scales_with_seconds() {
        let vdf = small_vdf();
        let short = vdf.estimate_iterations_for_seconds(1.0);
        let long = vdf.estimate_iterations_for_seconds(5.0);
        assert!(long >= short);
    }
}
