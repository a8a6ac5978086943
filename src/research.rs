//! Research-logging boundary
//!
//! Simulation summaries (ground-motion identifier, peak drift and
//! acceleration, convergence status) are pushed to an external record-keeping
//! service so every data point stays traceable. That service lives outside
//! this crate; here only the boundary is modeled: a [`ResearchSink`] trait
//! plus a local newline-delimited JSON implementation.
//!
//! The sink is fire-and-forget from the pipeline's point of view: a failing
//! record must never corrupt pipeline state. Batch logging captures each
//! item's failure independently and keeps going.

use crate::error::PrepError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Convergence state of one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    Converged,
    Diverged,
    Running,
}

/// Manuscript phase a result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResearchPhase {
    Methods,
    Results,
    Validation,
}

/// Scalar summary of one NLTHA simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    /// Name/ID of the ground-motion record (e.g. "RSN953_Northridge")
    pub ground_motion: String,
    /// Maximum inter-story drift ratio (0.023 = 2.3%)
    pub max_drift: f64,
    /// Peak ground acceleration (g)
    pub peak_acceleration: f64,
    pub convergence_status: ConvergenceStatus,
    /// Number of stories in the structural model
    pub num_stories: u32,
    pub phase: ResearchPhase,
    pub notes: String,
    /// Citation reference for traceability, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl SimulationRecord {
    pub fn new(ground_motion: impl Into<String>, max_drift: f64) -> Self {
        Self {
            ground_motion: ground_motion.into(),
            max_drift,
            peak_acceleration: 0.0,
            convergence_status: ConvergenceStatus::Converged,
            num_stories: 5,
            phase: ResearchPhase::Methods,
            notes: String::new(),
            source_ref: None,
            recorded_at: Utc::now(),
        }
    }
}

/// One failed item of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub error: String,
}

/// Outcome of a batch logging call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub logged: usize,
    pub failures: Vec<BatchFailure>,
}

/// Destination for simulation summaries
pub trait ResearchSink {
    /// Log one simulation record
    fn log_record(&mut self, record: &SimulationRecord) -> Result<(), PrepError>;

    /// Log a batch of records. Each item's failure is captured independently;
    /// the batch is never aborted part-way.
    fn log_batch(&mut self, records: &[SimulationRecord]) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, record) in records.iter().enumerate() {
            match self.log_record(record) {
                Ok(()) => report.logged += 1,
                Err(e) => {
                    error!("failed on record {}: {}", index, e);
                    report.failures.push(BatchFailure {
                        index,
                        error: e.to_string(),
                    });
                }
            }
        }
        info!("batch complete: {}/{} logged", report.logged, records.len());
        report
    }
}

/// Newline-delimited JSON sink appending to a local file
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Conventional location inside the external-artifacts directory
    pub fn in_dir(external_dir: &Path) -> Self {
        Self::new(external_dir.join("research_log.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResearchSink for JsonlSink {
    fn log_record(&mut self, record: &SimulationRecord) -> Result<(), PrepError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        info!(
            "logged {} | drift={:.4} | status={:?}",
            record.ground_motion, record.max_drift, record.convergence_status
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Sink that rejects records above a drift threshold, for batch tests
    struct RejectingSink {
        accepted: Vec<String>,
    }

    impl ResearchSink for RejectingSink {
        fn log_record(&mut self, record: &SimulationRecord) -> Result<(), PrepError> {
            if record.max_drift > 0.1 {
                return Err(PrepError::Research(format!(
                    "drift {} out of range",
                    record.max_drift
                )));
            }
            self.accepted.push(record.ground_motion.clone());
            Ok(())
        }
    }

    #[test]
    fn test_jsonl_sink_appends_records() {
        let dir = tempdir().unwrap();
        let mut sink = JsonlSink::in_dir(dir.path());

        sink.log_record(&SimulationRecord::new("RSN953_Northridge", 0.0234))
            .unwrap();
        sink.log_record(&SimulationRecord::new("RSN1086_Kobe", 0.0311))
            .unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: SimulationRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.ground_motion, "RSN953_Northridge");
        assert!((first.max_drift - 0.0234).abs() < 1e-12);
        assert_eq!(first.convergence_status, ConvergenceStatus::Converged);
    }

    #[test]
    fn test_batch_captures_per_item_failures() {
        let mut sink = RejectingSink { accepted: vec![] };
        let records = vec![
            SimulationRecord::new("gm_ok_1", 0.02),
            SimulationRecord::new("gm_bad", 0.5),
            SimulationRecord::new("gm_ok_2", 0.03),
        ];

        let report = sink.log_batch(&records);

        assert_eq!(report.logged, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(report.failures[0].error.contains("out of range"));
        // The failure did not abort the rest of the batch
        assert_eq!(sink.accepted, vec!["gm_ok_1", "gm_ok_2"]);
    }

    #[test]
    fn test_status_serializes_capitalized() {
        let json = serde_json::to_string(&ConvergenceStatus::Converged).unwrap();
        assert_eq!(json, "\"Converged\"");
    }
}
