//! nprep CLI - Command-line interface for nltha-prep
//!
//! Commands:
//! - run: Execute the full preparation pipeline over a raw-data directory
//! - measures: Compute intensity measures for one acceleration record
//! - doctor: Diagnose pipeline configuration and directory layout

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use nltha_prep::intensity::{extract_intensity_measures, DEFAULT_T1};
use nltha_prep::{PipelineConfig, PrepError, PrepPipeline, RunOutcome, ScalerType, PREP_VERSION};

/// nprep - Prepare NLTHA simulation outputs for model training
#[derive(Parser)]
#[command(name = "nprep")]
#[command(version = PREP_VERSION)]
#[command(about = "Prepare NLTHA datasets: validate, extract, normalize, split", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the full preparation pipeline
    Run {
        /// Directory scanned recursively for raw .csv/.hdf5/.h5 files
        #[arg(long, default_value = "data/raw")]
        raw_dir: PathBuf,

        /// Directory the processed dataset is written to
        #[arg(long, default_value = "data/processed")]
        out_dir: PathBuf,

        /// Feature scaling strategy
        #[arg(long, value_enum, default_value = "standard")]
        scaler: ScalerArg,

        /// Train fraction (the three ratios must sum to 1.0)
        #[arg(long, default_value = "0.70")]
        train_ratio: f64,

        /// Validation fraction
        #[arg(long, default_value = "0.15")]
        val_ratio: f64,

        /// Test fraction
        #[arg(long, default_value = "0.15")]
        test_ratio: f64,

        /// Seed for the split permutation
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Collapse threshold on drift/IDR columns
        #[arg(long, default_value = "0.10")]
        max_idr: f64,

        /// Sanity cap on peak ground acceleration (g)
        #[arg(long, default_value = "5.0")]
        max_pga: f64,

        /// Fundamental period for Sa(T1) extraction (seconds)
        #[arg(long, default_value = "0.5")]
        t1: f64,
    },

    /// Compute intensity measures for one acceleration record
    Measures {
        /// CSV file whose first column holds acceleration samples
        #[arg(short, long)]
        input: PathBuf,

        /// Sample time step (seconds)
        #[arg(long)]
        dt: f64,

        /// Fundamental period for Sa(T1) (seconds)
        #[arg(long, default_value_t = DEFAULT_T1)]
        t1: f64,

        /// Emit the measures as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose pipeline configuration and directory layout
    Doctor {
        /// Raw-data directory to check
        #[arg(long, default_value = "data/raw")]
        raw_dir: PathBuf,

        /// Output directory to check
        #[arg(long, default_value = "data/processed")]
        out_dir: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScalerArg {
    Standard,
    Minmax,
}

impl From<ScalerArg> for ScalerType {
    fn from(arg: ScalerArg) -> Self {
        match arg {
            ScalerArg::Standard => ScalerType::Standard,
            ScalerArg::Minmax => ScalerType::Minmax,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), NprepError> {
    match cli.command {
        Commands::Run {
            raw_dir,
            out_dir,
            scaler,
            train_ratio,
            val_ratio,
            test_ratio,
            seed,
            max_idr,
            max_pga,
            t1,
        } => {
            let config = PipelineConfig {
                raw_dir,
                out_dir,
                scaler_type: scaler.into(),
                train_ratio,
                val_ratio,
                test_ratio,
                seed,
                max_idr,
                max_pga,
                t1,
                ..Default::default()
            };
            cmd_run(config)
        }

        Commands::Measures { input, dt, t1, json } => cmd_measures(&input, dt, t1, json),

        Commands::Doctor {
            raw_dir,
            out_dir,
            json,
        } => cmd_doctor(&raw_dir, &out_dir, json),
    }
}

fn cmd_run(config: PipelineConfig) -> Result<(), NprepError> {
    let mut pipeline = PrepPipeline::new(config)?;
    match pipeline.run()? {
        RunOutcome::Completed(sizes) => {
            println!(
                "done: train={}, val={}, test={}",
                sizes.train, sizes.val, sizes.test
            );
            Ok(())
        }
        RunOutcome::NoData => Err(NprepError::NoData),
    }
}

fn cmd_measures(input: &Path, dt: f64, t1: f64, json: bool) -> Result<(), NprepError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(input)
        .map_err(PrepError::from)?;

    let mut acc = Vec::new();
    for record in reader.records() {
        let record = record.map_err(PrepError::from)?;
        if let Some(field) = record.get(0) {
            let trimmed = field.trim();
            if trimmed.is_empty() {
                continue;
            }
            match trimmed.parse::<f64>() {
                Ok(value) => acc.push(value),
                // Tolerate a single header line
                Err(_) if acc.is_empty() => continue,
                Err(e) => {
                    return Err(NprepError::Parse(format!(
                        "non-numeric sample {:?}: {}",
                        trimmed, e
                    )))
                }
            }
        }
    }

    if acc.is_empty() {
        return Err(NprepError::NoSamples);
    }

    let measures = extract_intensity_measures(&acc, dt, t1);
    if json {
        println!("{}", serde_json::to_string_pretty(&measures).map_err(PrepError::from)?);
    } else {
        println!("PGA:      {:.6}", measures.pga);
        println!("PGV:      {:.6}", measures.pgv);
        println!("Sa(T1):   {:.6}", measures.sa_t1);
        println!("Arias:    {:.6}", measures.arias);
        println!("duration: {:.3}", measures.duration);
        if measures.sa_fallback {
            println!("note: Sa(T1) degraded to the PGA substitute");
        }
    }
    Ok(())
}

fn cmd_doctor(raw_dir: &Path, out_dir: &Path, json: bool) -> Result<(), NprepError> {
    let mut checks = Vec::new();

    if raw_dir.is_dir() {
        let n_files = count_ingestible(raw_dir);
        if n_files > 0 {
            checks.push(DoctorCheck {
                name: "raw_dir".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} ingestible files in {}", n_files, raw_dir.display()),
            });
        } else {
            checks.push(DoctorCheck {
                name: "raw_dir".to_string(),
                status: CheckStatus::Warning,
                message: format!("no .csv/.hdf5/.h5 files in {}", raw_dir.display()),
            });
        }
    } else {
        checks.push(DoctorCheck {
            name: "raw_dir".to_string(),
            status: CheckStatus::Error,
            message: format!("{} does not exist", raw_dir.display()),
        });
    }

    match fs::create_dir_all(out_dir) {
        Ok(()) => checks.push(DoctorCheck {
            name: "out_dir".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} is writable", out_dir.display()),
        }),
        Err(e) => checks.push(DoctorCheck {
            name: "out_dir".to_string(),
            status: CheckStatus::Error,
            message: format!("cannot create {}: {}", out_dir.display(), e),
        }),
    }

    let config = PipelineConfig::default();
    match config.validate() {
        Ok(()) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "default configuration is valid".to_string(),
        }),
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let report = DoctorReport {
        producer: nltha_prep::PRODUCER_NAME.to_string(),
        version: PREP_VERSION.to_string(),
        checks,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(PrepError::from)?
        );
    } else {
        println!("nprep Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(NprepError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn count_ingestible(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let mut count = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            count += count_ingestible(&path);
        } else if path.extension().is_some_and(|e| {
            e.eq_ignore_ascii_case("csv")
                || e.eq_ignore_ascii_case("hdf5")
                || e.eq_ignore_ascii_case("h5")
        }) {
            count += 1;
        }
    }
    count
}

// Error types

#[derive(Debug)]
enum NprepError {
    Prep(PrepError),
    Parse(String),
    NoSamples,
    NoData,
    DoctorFailed,
}

impl From<PrepError> for NprepError {
    fn from(e: PrepError) -> Self {
        NprepError::Prep(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<NprepError> for CliError {
    fn from(e: NprepError) -> Self {
        match e {
            NprepError::Prep(e) => CliError {
                code: "PIPELINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check configuration and file paths".to_string()),
            },
            NprepError::Parse(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Samples must be one numeric value per line".to_string()),
            },
            NprepError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No acceleration samples found in input".to_string(),
                hint: Some("Ensure the input file is not empty".to_string()),
            },
            NprepError::NoData => CliError {
                code: "NO_DATA".to_string(),
                message: "No ingestible rows found in the raw-data directory".to_string(),
                hint: Some("Place NLTHA outputs (.csv/.hdf5/.h5) in the raw directory".to_string()),
            },
            NprepError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
