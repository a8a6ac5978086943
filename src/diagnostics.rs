//! Run diagnostics
//!
//! Stage-local issues (a skipped source file, removed rows, a spectral
//! fallback) are absorbed rather than raised. They still need an audit trail,
//! so the orchestrator records each of them as a [`DiagnosticEvent`] through
//! an injected [`DiagnosticsSink`]. Each pipeline instance carries its own
//! sink; the library never installs process-global logging state.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One recordable condition observed during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A source file could not be read or parsed and was skipped
    FileSkipped { file: String, reason: String },
    /// Validation removed rows
    RowsRemoved {
        removed_missing: usize,
        removed_bounds: usize,
    },
    /// Spectral-acceleration computation degraded to the PGA substitute
    SpectralFallback { rows: usize },
    /// Ingestion produced zero usable rows; the run ended with no output
    EmptyInput,
    /// An output artifact was written
    ArtifactWritten { file: String },
}

/// A diagnostic with its observation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

impl DiagnosticEvent {
    pub fn now(diagnostic: Diagnostic) -> Self {
        Self {
            at: Utc::now(),
            diagnostic,
        }
    }
}

/// Destination for diagnostic events, injected at pipeline construction
pub trait DiagnosticsSink {
    fn record(&mut self, event: DiagnosticEvent);
}

/// In-memory sink keeping events in observation order
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<DiagnosticEvent>,
}

impl EventLog {
    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over the recorded diagnostics without their timestamps
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().map(|e| &e.diagnostic)
    }
}

impl DiagnosticsSink for EventLog {
    fn record(&mut self, event: DiagnosticEvent) {
        self.events.push(event);
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn record(&mut self, _event: DiagnosticEvent) {}
}
