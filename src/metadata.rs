//! Pipeline provenance metadata
//!
//! A metadata record is created when the orchestrator is constructed and only
//! ever appended to as stages complete: sample counts after ingest and
//! validation, the feature count after normalization, partition sizes after
//! the split. It is written verbatim to `pipeline_metadata.json` at export
//! time so every processed dataset carries its own provenance.

use crate::config::{PipelineConfig, ScalerType};
use crate::PRODUCER_NAME;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Producer identification embedded in every metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
}

/// Snapshot of the configuration values that shape the output dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    pub scaler_type: ScalerType,
    pub train_ratio: f64,
    pub val_ratio: f64,
    pub test_ratio: f64,
    pub seed: u64,
}

impl ConfigSnapshot {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            scaler_type: config.scaler_type,
            train_ratio: config.train_ratio,
            val_ratio: config.val_ratio,
            test_ratio: config.test_ratio,
            seed: config.seed,
        }
    }
}

/// Row counts of the three exported partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitSizes {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

/// Append-only provenance record for one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineMetadata {
    /// Creation timestamp (ISO-8601, UTC)
    pub created: DateTime<Utc>,
    /// Unique identifier of this run
    pub run_id: Uuid,
    pub producer: Producer,
    pub config: ConfigSnapshot,
    pub n_samples_raw: usize,
    pub n_samples_valid: usize,
    pub n_features: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_sizes: Option<SplitSizes>,
}

impl PipelineMetadata {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            created: Utc::now(),
            run_id: Uuid::new_v4(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            config: ConfigSnapshot::from_config(config),
            n_samples_raw: 0,
            n_samples_valid: 0,
            n_features: 0,
            split_sizes: None,
        }
    }
}
