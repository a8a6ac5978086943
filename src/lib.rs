//! nltha-prep - Data preparation engine for NLTHA simulation outputs
//!
//! Transforms raw nonlinear time-history analysis results into validated,
//! feature-engineered, normalized and split datasets through a deterministic
//! pipeline: ingest → validate → intensity-measure extraction → normalize →
//! split → export, with provenance metadata tracked across every stage.
//!
//! ## Modules
//!
//! - **Intensity measures**: PGA, PGV, Sa(T1), Arias intensity and duration
//!   from acceleration time series
//! - **Pipeline**: the staged orchestrator with injectable diagnostics
//! - **Research boundary**: fire-and-forget logging of simulation summaries

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ingest;
pub mod intensity;
pub mod metadata;
pub mod normalize;
pub mod pipeline;
pub mod research;
pub mod split;
pub mod table;
pub mod validate;

pub use config::{PipelineConfig, ScalerType};
pub use diagnostics::{Diagnostic, DiagnosticEvent, DiagnosticsSink, EventLog};
pub use error::PrepError;
pub use intensity::{extract_intensity_measures, IntensityMeasures};
pub use pipeline::{PrepPipeline, RunOutcome};
pub use research::{JsonlSink, ResearchSink, SimulationRecord};
pub use table::{Cell, DataTable};

/// Crate version embedded in all exported metadata
pub const PREP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for exported metadata
pub const PRODUCER_NAME: &str = "nltha-prep";
