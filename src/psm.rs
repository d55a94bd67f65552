//! PSM record and table types, and single-file TSV loading.
//!
//! A PSM table is one `psm.tsv` per acquisition run. Every original column
//! is carried through unmodified; derived annotations live in named optional
//! fields on [`PsmRecord`] rather than loosely-typed extra columns. A row
//! whose `Spectrum` value cannot be parsed keeps all of its original fields
//! and simply has absent derived fields.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::aggregate::WindowCategory;
use crate::parse::{parse_folder_name, parse_spectrum_id, spectrum_key};

/// Name of the composite spectrum-identifier column.
pub const SPECTRUM_COLUMN: &str = "Spectrum";

/// Name of the peptide-sequence column.
pub const PEPTIDE_COLUMN: &str = "Peptide";

/// Errors that can occur during PSM ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TSV parsing error
    #[error("TSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Required column missing from the input table
    #[error("missing required column '{column}' in {}", path.display())]
    MissingColumn {
        /// The expected column name.
        column: String,
        /// The file that lacks it.
        path: PathBuf,
    },

    /// Input table has a header but no rows
    #[error("empty table: {}", .0.display())]
    EmptyTable(PathBuf),

    /// Input directory does not exist
    #[error("input directory not found: {}", .0.display())]
    InputDirNotFound(PathBuf),

    /// No input files discovered under the input directory
    #[error("no psm.tsv files found under {}", .0.display())]
    NoInputFiles(PathBuf),

    /// Worker pool construction failed
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

/// One peptide-spectrum match with passthrough and derived fields.
///
/// `raw_fields` is aligned with the owning table's `columns`; derived fields
/// are `None` when the source folder or the `Spectrum` value did not parse.
#[derive(Debug, Clone)]
pub struct PsmRecord {
    /// Original field values, aligned with [`PsmTable::columns`].
    pub raw_fields: Vec<String>,
    /// Immediate parent folder of the source file.
    pub source_folder: String,
    /// Acquisition isolation window in m/z, from the folder name.
    pub window_mz: Option<f64>,
    /// Replicate index, from the folder name.
    pub replicate: Option<u32>,
    /// Originating run name, from the `Spectrum` column.
    pub run_name: Option<String>,
    /// Scan number within the run.
    pub scan_number: Option<u64>,
    /// Charge state from the `Spectrum` column.
    pub charge: Option<i16>,
    /// Globally unique spectrum key; present only when run and scan parsed.
    pub spectrum_key: Option<String>,
    /// Window size bucket, filled in by the aggregation pass.
    pub window_category: Option<WindowCategory>,
    /// Number of PSMs sharing this spectrum key, filled in by aggregation.
    pub psm_count: Option<u64>,
    /// Whether the spectrum has two or more competing identifications.
    pub is_chimeric: bool,
    /// Peptide length after stripping modification annotations.
    pub peptide_length: Option<usize>,
}

impl PsmRecord {
    /// Raw value of the column at `index`, if the row has one.
    pub fn raw_field(&self, index: usize) -> Option<&str> {
        self.raw_fields.get(index).map(String::as_str)
    }
}

/// A set of PSM records sharing one column layout.
///
/// Either one file's rows, or the consolidated batch after
/// [`consolidate`](PsmTable::consolidate) (where `columns` is the union of
/// the per-file headers in first-seen order).
#[derive(Debug, Clone, Default)]
pub struct PsmTable {
    /// Input column names, in order.
    pub columns: Vec<String>,
    /// Rows, in input order (grouped by source file after consolidation).
    pub records: Vec<PsmRecord>,
}

impl PsmTable {
    /// Index of a named input column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge per-file tables into one consolidated table.
    ///
    /// The consolidated column set is the union of the input headers in
    /// first-seen order; rows from files lacking a column get an empty
    /// field there. Within-file row order is preserved.
    pub fn consolidate(tables: Vec<PsmTable>) -> PsmTable {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for col in &table.columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }

        let total_rows: usize = tables.iter().map(PsmTable::len).sum();
        let mut records = Vec::with_capacity(total_rows);

        for table in tables {
            // Map this file's column positions into the union layout.
            let mapping: Vec<usize> = table
                .columns
                .iter()
                .map(|col| {
                    columns
                        .iter()
                        .position(|c| c == col)
                        .unwrap_or(columns.len())
                })
                .collect();

            for mut record in table.records {
                let mut remapped = vec![String::new(); columns.len()];
                for (src, value) in record.raw_fields.drain(..).enumerate() {
                    if let Some(&dst) = mapping.get(src) {
                        if dst < remapped.len() {
                            remapped[dst] = value;
                        }
                    }
                }
                record.raw_fields = remapped;
                records.push(record);
            }
        }

        PsmTable { columns, records }
    }
}

/// Load a single `psm.tsv` file and annotate every row.
///
/// Extracts window/replicate metadata from the parent folder name, parses
/// the `Spectrum` column, and assigns spectrum keys. File-level problems
/// (unreadable, missing `Spectrum` column, no rows) are errors for the
/// caller to drop; row-level parse failures leave derived fields absent.
pub fn load_psm_file(path: &Path) -> Result<PsmTable, IngestError> {
    let folder_name = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let folder_meta = parse_folder_name(&folder_name);

    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let spectrum_idx =
        columns
            .iter()
            .position(|c| c == SPECTRUM_COLUMN)
            .ok_or_else(|| IngestError::MissingColumn {
                column: SPECTRUM_COLUMN.to_string(),
                path: path.to_path_buf(),
            })?;

    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        let mut raw_fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        // Flexible rows may be short; keep alignment with the header.
        raw_fields.resize(columns.len(), String::new());

        let parsed = parse_spectrum_id(&raw_fields[spectrum_idx]);
        let (run_name, scan_number, charge) = match parsed {
            Some(id) => (Some(id.run_name), Some(id.scan_number), Some(id.charge)),
            None => (None, None, None),
        };

        let key = match (&run_name, scan_number) {
            (Some(run), Some(scan)) => Some(spectrum_key(run, scan)),
            _ => None,
        };

        records.push(PsmRecord {
            raw_fields,
            source_folder: folder_name.clone(),
            window_mz: folder_meta.window_mz,
            replicate: folder_meta.replicate,
            run_name,
            scan_number,
            charge,
            spectrum_key: key,
            window_category: None,
            psm_count: None,
            is_chimeric: false,
            peptide_length: None,
        });
    }

    if records.is_empty() {
        return Err(IngestError::EmptyTable(path.to_path_buf()));
    }

    Ok(PsmTable { columns, records })
}
