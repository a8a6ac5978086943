//! Record validation
//!
//! Applies data-quality and physical-plausibility filters to an ingested
//! table: rows with any missing cell are dropped outright (no imputation),
//! drift-like columns are bounded by the collapse threshold, and peak ground
//! acceleration is capped by a sanity bound. Removal counts are reported, not
//! raised; a table that validates down to zero rows is legal and downstream
//! stages must tolerate it.

use crate::config::PipelineConfig;
use crate::intensity::{DURATION_COLUMN, PGA_COLUMN};
use crate::table::{Cell, DataTable};
use serde::Serialize;
use tracing::info;

/// Counts reported by one validation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub n_input: usize,
    pub removed_missing: usize,
    pub removed_bounds: usize,
    pub n_output: usize,
}

impl ValidationSummary {
    pub fn n_removed(&self) -> usize {
        self.removed_missing + self.removed_bounds
    }
}

/// Physical-bounds validator
#[derive(Debug, Clone)]
pub struct Validator {
    max_idr: f64,
    max_pga: f64,
    min_duration: f64,
    drift_patterns: Vec<String>,
}

impl Validator {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_idr: config.max_idr,
            max_pga: config.max_pga,
            min_duration: config.min_duration,
            drift_patterns: config
                .drift_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    /// Whether a column name matches the configured drift/IDR patterns
    /// (case-insensitive substring match)
    pub fn is_drift_column(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.drift_patterns.iter().any(|p| lowered.contains(p))
    }

    /// Validate a table, returning the filtered table and removal counts.
    ///
    /// Idempotent: validating an already-validated table removes nothing.
    pub fn validate(&self, mut table: DataTable) -> (DataTable, ValidationSummary) {
        let n_input = table.n_rows();

        table.retain_rows(|row| !row.iter().any(Cell::is_missing));
        let after_missing = table.n_rows();

        let drift_columns: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| self.is_drift_column(name))
            .map(|(idx, _)| idx)
            .collect();
        let pga_column = table.column_index(PGA_COLUMN);
        let duration_column = table.column_index(DURATION_COLUMN);

        let max_idr = self.max_idr;
        let max_pga = self.max_pga;
        let min_duration = self.min_duration;
        table.retain_rows(|row| {
            let drift_ok = drift_columns.iter().all(|&idx| match row[idx].as_number() {
                Some(v) => v.abs() <= max_idr,
                None => true,
            });
            let pga_ok = pga_column
                .and_then(|idx| row[idx].as_number())
                .map_or(true, |v| v <= max_pga);
            let duration_ok = duration_column
                .and_then(|idx| row[idx].as_number())
                .map_or(true, |v| v >= min_duration);
            drift_ok && pga_ok && duration_ok
        });

        let n_output = table.n_rows();
        let summary = ValidationSummary {
            n_input,
            removed_missing: n_input - after_missing,
            removed_bounds: after_missing - n_output,
            n_output,
        };

        if summary.n_removed() > 0 {
            info!(
                "validation removed {} records ({} -> {})",
                summary.n_removed(),
                n_input,
                n_output
            );
        }

        (table, summary)
    }
}
