//! Pipeline configuration
//!
//! All knobs of the preparation pipeline live here: directory layout, split
//! ratios, scaler selection, physical validation bounds, and the random seed.
//! Split ratios are validated at pipeline construction and fail fast when they
//! do not sum to 1.0.

use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tolerance for the split-ratio sum check
pub const RATIO_TOLERANCE: f64 = 1e-6;

/// Feature scaling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalerType {
    Standard,
    Minmax,
}

impl ScalerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalerType::Standard => "standard",
            ScalerType::Minmax => "minmax",
        }
    }
}

/// Configuration for the NLTHA data pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory scanned recursively for raw simulation outputs
    pub raw_dir: PathBuf,
    /// Directory the processed dataset is exported to
    pub out_dir: PathBuf,
    /// Directory for externally shared artifacts (research log)
    pub external_dir: PathBuf,

    /// Train fraction (ratios must sum to 1.0)
    pub train_ratio: f64,
    /// Validation fraction
    pub val_ratio: f64,
    /// Test fraction
    pub test_ratio: f64,

    /// Feature scaling strategy
    pub scaler_type: ScalerType,

    /// Inter-story drift ratio above which a record is treated as collapse
    pub max_idr: f64,
    /// Upper sanity bound on peak ground acceleration (g)
    pub max_pga: f64,
    /// Minimum usable record duration (seconds)
    pub min_duration: f64,

    /// Seed for the split permutation
    pub seed: u64,

    /// Fundamental period used for Sa(T1) extraction (seconds)
    pub t1: f64,
    /// Case-insensitive substrings identifying drift/IDR columns
    pub drift_patterns: Vec<String>,
    /// Column-name prefix marking wide-format acceleration samples
    pub accel_prefix: String,
    /// Column holding the sample time step for wide-format records
    pub dt_column: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            out_dir: PathBuf::from("data/processed"),
            external_dir: PathBuf::from("data/external"),
            train_ratio: 0.70,
            val_ratio: 0.15,
            test_ratio: 0.15,
            scaler_type: ScalerType::Standard,
            max_idr: 0.10,
            max_pga: 5.0,
            min_duration: 5.0,
            seed: 42,
            t1: 0.5,
            drift_patterns: vec!["idr".to_string(), "drift".to_string()],
            accel_prefix: "acc_".to_string(),
            dt_column: "dt".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Check the configuration invariants.
    ///
    /// The only fatal condition is a split-ratio vector that does not describe
    /// a partition: each ratio must lie in [0, 1] and the three must sum to
    /// 1.0 within [`RATIO_TOLERANCE`].
    pub fn validate(&self) -> Result<(), PrepError> {
        for (name, ratio) in [
            ("train_ratio", self.train_ratio),
            ("val_ratio", self.val_ratio),
            ("test_ratio", self.test_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(PrepError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, ratio
                )));
            }
        }

        let total = self.train_ratio + self.val_ratio + self.test_ratio;
        if (total - 1.0).abs() >= RATIO_TOLERANCE {
            return Err(PrepError::Config(format!(
                "Split ratios must sum to 1.0, got {}",
                total
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ratios_must_sum_to_one() {
        let config = PipelineConfig {
            train_ratio: 0.8,
            val_ratio: 0.15,
            test_ratio: 0.15,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, PrepError::Config(_)));
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_negative_ratio_rejected() {
        let config = PipelineConfig {
            train_ratio: 1.1,
            val_ratio: -0.1,
            test_ratio: 0.0,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scaler_type_serialization() {
        assert_eq!(
            serde_json::to_string(&ScalerType::Standard).unwrap(),
            "\"standard\""
        );
        assert_eq!(
            serde_json::to_string(&ScalerType::Minmax).unwrap(),
            "\"minmax\""
        );
    }
}
