//! Pipeline orchestration
//!
//! [`PrepPipeline`] drives the sequential stages (ingest, validate, feature
//! extraction, normalize, split, export) and accumulates the provenance
//! metadata record across them. Data flows strictly forward; no
//! stage reaches back into an earlier stage's state except through the
//! metadata record, which is append-only for the duration of one [`run`].
//!
//! One orchestrator instance owns its configuration, metadata and diagnostics
//! sink exclusively, so independent instances can run side by side as long as
//! they write to different output directories.
//!
//! [`run`]: PrepPipeline::run

use crate::config::PipelineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticEvent, DiagnosticsSink, EventLog};
use crate::error::PrepError;
use crate::ingest::ingest_directory;
use crate::intensity::{
    extract_intensity_measures, ARIAS_COLUMN, DURATION_COLUMN, PGA_COLUMN, PGV_COLUMN,
    SA_T1_COLUMN,
};
use crate::metadata::{PipelineMetadata, SplitSizes};
use crate::normalize::{Normalizer, ScalerParams};
use crate::split::Splitter;
use crate::table::{Cell, DataTable, SOURCE_FILE_COLUMN};
use crate::validate::Validator;
use std::fs;
use tracing::{error, info, warn};

/// How a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// All stages ran; the dataset was exported with these partition sizes
    Completed(SplitSizes),
    /// Ingestion yielded zero usable rows; no artifacts were written
    NoData,
}

/// End-to-end data preparation pipeline for NLTHA outputs
pub struct PrepPipeline<S: DiagnosticsSink = EventLog> {
    config: PipelineConfig,
    metadata: PipelineMetadata,
    diagnostics: S,
}

impl PrepPipeline<EventLog> {
    /// Create a pipeline with an in-memory diagnostics log.
    ///
    /// Fails fast when the configured split ratios do not sum to 1.0.
    pub fn new(config: PipelineConfig) -> Result<Self, PrepError> {
        Self::with_diagnostics(config, EventLog::default())
    }
}

impl<S: DiagnosticsSink> PrepPipeline<S> {
    /// Create a pipeline with an explicitly injected diagnostics sink
    pub fn with_diagnostics(config: PipelineConfig, diagnostics: S) -> Result<Self, PrepError> {
        config.validate()?;
        let metadata = PipelineMetadata::new(&config);
        Ok(Self {
            config,
            metadata,
            diagnostics,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn metadata(&self) -> &PipelineMetadata {
        &self.metadata
    }

    pub fn diagnostics(&self) -> &S {
        &self.diagnostics
    }

    /// Execute the complete pipeline.
    ///
    /// Per-file ingestion failures and per-record spectral fallbacks are
    /// absorbed and recorded as diagnostics. An empty ingest ends the run
    /// cleanly with [`RunOutcome::NoData`] and no output artifacts. Export
    /// failures propagate.
    pub fn run(&mut self) -> Result<RunOutcome, PrepError> {
        info!("starting NLTHA data pipeline");

        let raw = ingest_directory(&self.config.raw_dir, &mut self.diagnostics);
        self.metadata.n_samples_raw = raw.n_rows();

        if raw.is_empty() {
            error!(
                "no data to process; place NLTHA outputs in {}",
                self.config.raw_dir.display()
            );
            self.diagnostics
                .record(DiagnosticEvent::now(Diagnostic::EmptyInput));
            return Ok(RunOutcome::NoData);
        }

        let validator = Validator::from_config(&self.config);
        let (mut data, summary) = validator.validate(raw);
        self.metadata.n_samples_valid = data.n_rows();
        if summary.n_removed() > 0 {
            self.diagnostics
                .record(DiagnosticEvent::now(Diagnostic::RowsRemoved {
                    removed_missing: summary.removed_missing,
                    removed_bounds: summary.removed_bounds,
                }));
        }

        self.extract_features(&mut data);

        let feature_columns = feature_columns(&data, &validator);
        let normalizer = Normalizer::new(self.config.scaler_type);
        let scaler_params = normalizer.fit_transform(&mut data, &feature_columns);
        self.metadata.n_features = feature_columns.len();

        let splitter = Splitter::from_config(&self.config);
        let (train, val, test) = splitter.split(&data);
        let sizes = SplitSizes {
            train: train.n_rows(),
            val: val.n_rows(),
            test: test.n_rows(),
        };
        self.metadata.split_sizes = Some(sizes);

        self.export(&train, &val, &test, &scaler_params)?;

        info!("pipeline completed successfully");
        Ok(RunOutcome::Completed(sizes))
    }

    /// Replace wide-format acceleration sample columns with the five
    /// intensity-measure columns.
    ///
    /// A raw time series is present when the table has sample columns named
    /// `<accel_prefix>0..<accel_prefix>N` together with a time-step column.
    /// Tables without such columns pass through untouched. Rows whose samples
    /// cannot be read numerically get null measures.
    fn extract_features(&mut self, table: &mut DataTable) {
        let mut sample_columns: Vec<(usize, usize, String)> = Vec::new();
        for (index, name) in table.columns().iter().enumerate() {
            if let Some(suffix) = name.strip_prefix(self.config.accel_prefix.as_str()) {
                if let Ok(sample) = suffix.parse::<usize>() {
                    sample_columns.push((sample, index, name.clone()));
                }
            }
        }

        let Some(dt_index) = table.column_index(&self.config.dt_column) else {
            return;
        };
        if sample_columns.is_empty() {
            return;
        }
        sample_columns.sort_by_key(|(sample, _, _)| *sample);
        let sample_indices: Vec<usize> = sample_columns
            .iter()
            .map(|(_, index, _)| *index)
            .collect();

        let mut pga = Vec::with_capacity(table.n_rows());
        let mut pgv = Vec::with_capacity(table.n_rows());
        let mut sa_t1 = Vec::with_capacity(table.n_rows());
        let mut arias = Vec::with_capacity(table.n_rows());
        let mut duration = Vec::with_capacity(table.n_rows());
        let mut fallbacks = 0_usize;

        for row_index in 0..table.n_rows() {
            let row = table.row(row_index);
            let dt = row[dt_index].as_number();
            let samples: Option<Vec<f64>> = sample_indices
                .iter()
                .map(|&idx| row[idx].as_number())
                .collect();

            match (dt, samples) {
                (Some(dt), Some(acc)) => {
                    let measures = extract_intensity_measures(&acc, dt, self.config.t1);
                    if measures.sa_fallback {
                        fallbacks += 1;
                    }
                    pga.push(Cell::Number(measures.pga));
                    pgv.push(Cell::Number(measures.pgv));
                    sa_t1.push(Cell::Number(measures.sa_t1));
                    arias.push(Cell::Number(measures.arias));
                    duration.push(Cell::Number(measures.duration));
                }
                _ => {
                    pga.push(Cell::Null);
                    pgv.push(Cell::Null);
                    sa_t1.push(Cell::Null);
                    arias.push(Cell::Null);
                    duration.push(Cell::Null);
                }
            }
        }

        table.set_column(PGA_COLUMN, pga);
        table.set_column(PGV_COLUMN, pgv);
        table.set_column(SA_T1_COLUMN, sa_t1);
        table.set_column(ARIAS_COLUMN, arias);
        table.set_column(DURATION_COLUMN, duration);

        let mut raw_columns: Vec<String> =
            sample_columns.into_iter().map(|(_, _, name)| name).collect();
        raw_columns.push(self.config.dt_column.clone());
        table.drop_columns(&raw_columns);

        if fallbacks > 0 {
            warn!(
                "spectral acceleration degraded to PGA for {} records",
                fallbacks
            );
            self.diagnostics
                .record(DiagnosticEvent::now(Diagnostic::SpectralFallback {
                    rows: fallbacks,
                }));
        }
        info!(
            "extracted intensity measures for {} records",
            table.n_rows()
        );
    }

    /// Write the three partitions, scaler parameters and metadata.
    /// Any I/O failure here is fatal; no partial-file cleanup is attempted.
    fn export(
        &mut self,
        train: &DataTable,
        val: &DataTable,
        test: &DataTable,
        scaler_params: &ScalerParams,
    ) -> Result<(), PrepError> {
        let out = &self.config.out_dir;
        fs::create_dir_all(out)?;

        for (name, partition) in [("train.csv", train), ("val.csv", val), ("test.csv", test)] {
            partition.write_csv(fs::File::create(out.join(name))?)?;
            self.diagnostics
                .record(DiagnosticEvent::now(Diagnostic::ArtifactWritten {
                    file: name.to_string(),
                }));
        }

        fs::write(
            out.join("scaler_params.json"),
            serde_json::to_string_pretty(scaler_params)?,
        )?;
        self.diagnostics
            .record(DiagnosticEvent::now(Diagnostic::ArtifactWritten {
                file: "scaler_params.json".to_string(),
            }));

        fs::write(
            out.join("pipeline_metadata.json"),
            serde_json::to_string_pretty(&self.metadata)?,
        )?;
        self.diagnostics
            .record(DiagnosticEvent::now(Diagnostic::ArtifactWritten {
                file: "pipeline_metadata.json".to_string(),
            }));

        info!("exported to {}", out.display());
        Ok(())
    }
}

/// Columns eligible for normalization: numeric, not the provenance column,
/// and not a drift/IDR response column (those are prediction targets).
fn feature_columns(table: &DataTable, validator: &Validator) -> Vec<String> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(index, name)| {
            name.as_str() != SOURCE_FILE_COLUMN
                && !validator.is_drift_column(name)
                && table.is_numeric_column(*index)
        })
        .map(|(_, name)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn config_for(raw: &Path, out: &Path) -> PipelineConfig {
        PipelineConfig {
            raw_dir: raw.to_path_buf(),
            out_dir: out.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_ratios_fail_at_construction() {
        let config = PipelineConfig {
            train_ratio: 0.9,
            val_ratio: 0.2,
            test_ratio: 0.1,
            ..Default::default()
        };

        let err = PrepPipeline::new(config).err().unwrap();
        assert!(matches!(err, PrepError::Config(_)));
    }

    #[test]
    fn test_end_to_end_with_bounds_filtering() {
        let raw = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_file(
            raw.path(),
            "batch1.csv",
            "PGA,Sa_T1,max_idr\n\
             0.3,0.5,0.02\n\
             0.4,0.6,0.15\n\
             6.0,0.7,0.03\n\
             0.5,0.8,0.04\n",
        );
        write_file(
            raw.path(),
            "batch2.csv",
            "PGA,Sa_T1,max_idr\n\
             0.6,0.9,0.05\n\
             0.7,1.0,0.06\n",
        );

        let mut pipeline =
            PrepPipeline::new(config_for(raw.path(), out.path())).unwrap();
        let outcome = pipeline.run().unwrap();

        // 6 raw rows; the IDR=0.15 and PGA=6.0 rows are removed
        assert_eq!(pipeline.metadata().n_samples_raw, 6);
        assert_eq!(pipeline.metadata().n_samples_valid, 4);
        let RunOutcome::Completed(sizes) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(sizes.train + sizes.val + sizes.test, 4);

        // All five artifacts exist
        for name in [
            "train.csv",
            "val.csv",
            "test.csv",
            "scaler_params.json",
            "pipeline_metadata.json",
        ] {
            assert!(out.path().join(name).exists(), "missing {}", name);
        }

        // Scaler covers the numeric feature columns, not the drift target or
        // the provenance column
        let params: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(out.path().join("scaler_params.json")).unwrap(),
        )
        .unwrap();
        assert!(params.get("PGA").is_some());
        assert!(params.get("Sa_T1").is_some());
        assert!(params.get("max_idr").is_none());
        assert!(params.get(SOURCE_FILE_COLUMN).is_none());

        // Metadata snapshot matches the run
        let metadata: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(out.path().join("pipeline_metadata.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(metadata["n_samples_raw"], 6);
        assert_eq!(metadata["n_samples_valid"], 4);
        assert_eq!(metadata["n_features"], 2);
        assert_eq!(metadata["config"]["seed"], 42);
        let split_total = metadata["split_sizes"]["train"].as_u64().unwrap()
            + metadata["split_sizes"]["val"].as_u64().unwrap()
            + metadata["split_sizes"]["test"].as_u64().unwrap();
        assert_eq!(split_total, 4);
    }

    #[test]
    fn test_empty_raw_dir_completes_without_artifacts() {
        let raw = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut pipeline =
            PrepPipeline::new(config_for(raw.path(), out.path())).unwrap();
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome, RunOutcome::NoData);
        for name in ["train.csv", "val.csv", "test.csv"] {
            assert!(!out.path().join(name).exists());
        }
        assert!(pipeline
            .diagnostics()
            .diagnostics()
            .any(|d| matches!(d, Diagnostic::EmptyInput)));
    }

    #[test]
    fn test_wide_format_series_is_reduced_to_intensity_measures() {
        let raw = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_file(
            raw.path(),
            "motions.csv",
            "dt,acc_0,acc_1,acc_2,acc_3\n0.01,0.1,0.5,-0.3,0.2\n",
        );

        let mut pipeline =
            PrepPipeline::new(config_for(raw.path(), out.path())).unwrap();
        pipeline.run().unwrap();

        // n=1: both floor boundaries are 0, the remainder row lands in test
        let test_table = DataTable::read_csv(
            fs::File::open(out.path().join("test.csv")).unwrap(),
        )
        .unwrap();
        assert_eq!(test_table.n_rows(), 1);

        for name in ["PGA", "PGV", "Sa_T1", "Arias", "duration"] {
            assert!(test_table.has_column(name), "missing {}", name);
        }
        assert!(!test_table.has_column("acc_0"));
        assert!(!test_table.has_column("dt"));

        // Single-row table: degenerate scalers leave raw values in place
        assert_eq!(test_table.numeric_values("PGA"), vec![0.5]);
        let duration = test_table.numeric_values("duration");
        assert!((duration[0] - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_spectral_fallback_is_recorded() {
        let raw = tempdir().unwrap();
        let out = tempdir().unwrap();
        // dt² overflows to infinity, forcing the degraded Sa path
        write_file(
            raw.path(),
            "degenerate.csv",
            "dt,acc_0,acc_1\n1e308,0.1,0.2\n",
        );

        let mut pipeline =
            PrepPipeline::new(config_for(raw.path(), out.path())).unwrap();
        pipeline.run().unwrap();

        assert!(pipeline
            .diagnostics()
            .diagnostics()
            .any(|d| matches!(d, Diagnostic::SpectralFallback { rows: 1 })));
    }

    #[test]
    fn test_malformed_file_does_not_abort_run() {
        let raw = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_file(raw.path(), "good.csv", "PGA\n0.3\n0.4\n");
        write_file(raw.path(), "bad.csv", "PGA\n0.1,0.2,0.3\n");

        let mut pipeline =
            PrepPipeline::new(config_for(raw.path(), out.path())).unwrap();
        let outcome = pipeline.run().unwrap();

        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(pipeline.metadata().n_samples_raw, 2);
        assert!(pipeline
            .diagnostics()
            .diagnostics()
            .any(|d| matches!(d, Diagnostic::FileSkipped { .. })));
    }
}
