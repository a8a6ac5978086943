//! Raw-data ingestion
//!
//! Recursively scans the raw-data directory for `*.csv`, `*.hdf5` and `*.h5`
//! files, parses each file independently, tags its rows with the originating
//! file name, and concatenates everything into one union-of-columns table.
//!
//! Ingestion is partial-failure tolerant: an unreadable or malformed file is
//! logged, recorded as a diagnostic, and skipped; the remaining files are
//! still processed. A directory with no usable data yields an empty table,
//! never an error.
//!
//! HDF5 support is feature-gated (`hdf5`) because it links against the native
//! libhdf5. Without the feature, HDF5 files are skipped with a warning. Each
//! 1-D float dataset of an HDF5 file becomes one column; all datasets of a
//! file must have equal length.

use crate::diagnostics::{Diagnostic, DiagnosticEvent, DiagnosticsSink};
use crate::error::PrepError;
use crate::table::{Cell, DataTable, SOURCE_FILE_COLUMN};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File extensions recognized as raw simulation outputs, in scan order
const SCAN_EXTENSIONS: [&str; 3] = ["csv", "hdf5", "h5"];

/// Ingest every recognized file under `raw_dir` into one table.
///
/// Files are visited per extension in lexicographic path order, so repeated
/// runs over the same tree produce the same row order.
pub fn ingest_directory<S: DiagnosticsSink>(raw_dir: &Path, sink: &mut S) -> DataTable {
    let mut table = DataTable::default();
    let mut n_files = 0_usize;

    for path in scan_files(raw_dir) {
        match read_file(&path) {
            Ok(file_table) => {
                n_files += 1;
                table.append(file_table);
            }
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                sink.record(DiagnosticEvent::now(Diagnostic::FileSkipped {
                    file: path.display().to_string(),
                    reason: e.to_string(),
                }));
            }
        }
    }

    if n_files == 0 {
        warn!("no raw data files found in {}", raw_dir.display());
    } else {
        info!("ingested {} records from {} files", table.n_rows(), n_files);
    }
    table
}

/// Collect ingestible files grouped by extension, each group sorted by path
fn scan_files(raw_dir: &Path) -> Vec<PathBuf> {
    let mut all = Vec::new();
    for ext in SCAN_EXTENSIONS {
        let mut group = Vec::new();
        collect_with_extension(raw_dir, ext, &mut group);
        group.sort();
        all.extend(group);
    }
    all
}

fn collect_with_extension(dir: &Path, ext: &str, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_with_extension(&path, ext, out);
        } else if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        {
            out.push(path);
        }
    }
}

/// Parse one source file into a table tagged with its file name
fn read_file(path: &Path) -> Result<DataTable, PrepError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut table = match extension.as_str() {
        "csv" => read_csv_file(path)?,
        "hdf5" | "h5" => read_hdf5_file(path)?,
        other => {
            return Err(PrepError::Ingest(format!(
                "unsupported extension: {}",
                other
            )))
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let tags = vec![Cell::Text(file_name); table.n_rows()];
    table.set_column(SOURCE_FILE_COLUMN, tags);

    Ok(table)
}

fn read_csv_file(path: &Path) -> Result<DataTable, PrepError> {
    let file = fs::File::open(path)?;
    DataTable::read_csv(file)
}

#[cfg(feature = "hdf5")]
fn read_hdf5_file(path: &Path) -> Result<DataTable, PrepError> {
    let file =
        hdf5::File::open(path).map_err(|e| PrepError::Ingest(e.to_string()))?;
    let names = file
        .member_names()
        .map_err(|e| PrepError::Ingest(e.to_string()))?;

    let mut table = DataTable::default();
    let mut n_rows: Option<usize> = None;

    for name in names {
        let dataset = file
            .dataset(&name)
            .map_err(|e| PrepError::Ingest(e.to_string()))?;
        let values: Vec<f64> = dataset
            .read_1d::<f64>()
            .map_err(|e| PrepError::Ingest(e.to_string()))?
            .to_vec();

        match n_rows {
            None => {
                n_rows = Some(values.len());
                let mut column = DataTable::new(vec![name]);
                for v in &values {
                    column.push_row(vec![Cell::Number(*v)]);
                }
                table = column;
            }
            Some(expected) if expected == values.len() => {
                table.set_column(&name, values.into_iter().map(Cell::Number).collect());
            }
            Some(expected) => {
                return Err(PrepError::Ingest(format!(
                    "dataset {} has {} rows, expected {}",
                    name,
                    values.len(),
                    expected
                )));
            }
        }
    }

    Ok(table)
}

#[cfg(not(feature = "hdf5"))]
fn read_hdf5_file(_path: &Path) -> Result<DataTable, PrepError> {
    Err(PrepError::Ingest(
        "hdf5 support not enabled (build with the `hdf5` feature)".to_string(),
    ))
}
