//! Observer configuration: epoch timing target, calibration seed, and an
//! optional modulus override, mirroring the teacher's `NetworkConfig`
//! (`Default` impl plus a `validate()` gate).

use crate::error::ConfigError;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Default target epoch duration (spec.md §4.D: `target = 10s` in the
/// calibration examples).
pub const DEFAULT_TARGET_EPOCH_SECONDS: f64 = 10.0;

/// Iterations used for the very first calibration run on cold start
/// (spec.md §4.D).
pub const COLD_START_CALIBRATION_ITERATIONS: u64 = 10_000;

/// Fallback iteration count if cold-start calibration fails (spec.md §4.D).
pub const COLD_START_FALLBACK_ITERATIONS: u64 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Target wall-clock duration for a sealed epoch.
    pub target_epoch_seconds: f64,
    /// Iterations used for the bootstrap calibration run.
    pub calibration_iterations: u64,
    /// Iterations to fall back to if calibration fails.
    pub fallback_iterations: u64,
    /// Hex-encoded modulus override; `None` uses the RSA-2048 default.
    pub modulus_hex: Option<String>,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            target_epoch_seconds: DEFAULT_TARGET_EPOCH_SECONDS,
            calibration_iterations: COLD_START_CALIBRATION_ITERATIONS,
            fallback_iterations: COLD_START_FALLBACK_ITERATIONS,
            modulus_hex: None,
        }
    }
}

impl ObserverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_epoch_seconds.is_finite() && self.target_epoch_seconds > 0.0) {
            return Err(ConfigError::InvalidEpochDuration(self.target_epoch_seconds.to_string()));
        }
        if let Some(hex) = &self.modulus_hex {
            crate::bigint::from_hex(hex)?;
        }
        Ok(())
    }

    /// Resolve the configured modulus, falling back to the RSA-2048
    /// default when no override is set.
    pub fn modulus(&self) -> Result<BigUint, ConfigError> {
        match &self.modulus_hex {
            Some(hex) => Ok(crate::bigint::from_hex(hex)?),
            None => Ok(crate::vdf::rsa_2048_modulus()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ObserverConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_nonpositive_duration() {
        let mut c = ObserverConfig::default();
        c.target_epoch_seconds = 0.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_bad_modulus_hex() {
        let mut c = ObserverConfig::default();
        c.modulus_hex = Some("not hex".to_string());
        assert!(c.validate().is_err());
    }
}
