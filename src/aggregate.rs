//! Derived-column computation and summary statistics.
//!
//! Everything here is a pure function of an already-loaded table: window
//! size bucketing, per-spectrum-key PSM counts, the chimeric flag, and
//! peptide length after stripping modification annotations. No I/O.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::psm::{PsmTable, PEPTIDE_COLUMN};

/// Window size bucket boundaries in m/z: (0, 4] narrow, (4, 12] medium,
/// (12, 100] wide.
const WINDOW_BREAKPOINTS: [f64; 4] = [0.0, 4.0, 12.0, 100.0];

/// Categorical bucket for the acquisition window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowCategory {
    /// Window in (0, 4] m/z.
    Narrow,
    /// Window in (4, 12] m/z.
    Medium,
    /// Window in (12, 100] m/z.
    Wide,
}

impl WindowCategory {
    /// Bucket a window size; `None` outside (0, 100].
    pub fn from_window_mz(window_mz: f64) -> Option<Self> {
        if window_mz <= WINDOW_BREAKPOINTS[0] {
            return None;
        }
        if window_mz <= WINDOW_BREAKPOINTS[1] {
            Some(Self::Narrow)
        } else if window_mz <= WINDOW_BREAKPOINTS[2] {
            Some(Self::Medium)
        } else if window_mz <= WINDOW_BREAKPOINTS[3] {
            Some(Self::Wide)
        } else {
            None
        }
    }

    /// Lowercase label used in the output tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Narrow => "narrow",
            Self::Medium => "medium",
            Self::Wide => "wide",
        }
    }
}

impl std::fmt::Display for WindowCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip bracketed modification annotations from a peptide sequence.
///
/// Only characters outside `[...]` pairs are kept, so
/// `PEPT[79.9663]IDE` becomes `PEPTIDE`. An unclosed trailing bracket
/// swallows the rest of the string.
pub fn strip_modifications(peptide: &str) -> String {
    let mut stripped = String::with_capacity(peptide.len());
    let mut depth = 0usize;
    for ch in peptide.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }
    stripped
}

/// Compute all derived columns in place.
///
/// Fills `window_category`, `psm_count`, `is_chimeric` and, when the table
/// has a peptide column, `peptide_length`. Records without a spectrum key
/// are excluded from the key-dependent aggregates.
pub fn add_derived_columns(table: &mut PsmTable) {
    let mut key_counts: HashMap<String, u64> = HashMap::new();
    for record in &table.records {
        if let Some(key) = &record.spectrum_key {
            *key_counts.entry(key.clone()).or_insert(0) += 1;
        }
    }

    let peptide_idx = table.column_index(PEPTIDE_COLUMN);

    for record in &mut table.records {
        record.window_category = record.window_mz.and_then(WindowCategory::from_window_mz);

        if let Some(key) = &record.spectrum_key {
            let count = key_counts.get(key).copied().unwrap_or(0);
            record.psm_count = Some(count);
            record.is_chimeric = count >= 2;
        }

        if let Some(idx) = peptide_idx {
            record.peptide_length = record
                .raw_field(idx)
                .filter(|p| !p.is_empty())
                .map(|p| strip_modifications(p).chars().count());
        }
    }
}

/// Build the spectrum-key to run-name lookup.
///
/// One entry per distinct key; read-only after construction, persisted for
/// downstream consumers that need to locate a spectrum's source run.
pub fn spectrum_to_run(table: &PsmTable) -> BTreeMap<String, String> {
    let mut lookup = BTreeMap::new();
    for record in &table.records {
        if let (Some(key), Some(run)) = (&record.spectrum_key, &record.run_name) {
            lookup
                .entry(key.clone())
                .or_insert_with(|| run.clone());
        }
    }
    lookup
}

/// Aggregate counts for one acquisition window size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowAggregate {
    /// Window size in m/z.
    pub window_mz: f64,
    /// PSMs acquired with this window.
    pub psm_count: u64,
    /// Distinct spectrum keys with this window.
    pub unique_spectra: u64,
    /// Fraction of PSMs on chimeric spectra.
    pub chimeric_fraction: f64,
}

/// Summary statistics over the consolidated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Total PSM records.
    pub n_psm: u64,
    /// Distinct spectrum keys.
    pub n_spectra: u64,
    /// Distinct run names.
    pub n_runs: u64,
    /// Distinct chimeric spectrum keys.
    pub n_chimeric_spectra: u64,
    /// Average PSMs per distinct spectrum.
    pub avg_psm_per_spectrum: f64,
    /// Sorted distinct window sizes.
    pub window_sizes: Vec<f64>,
    /// Per-window aggregates, sorted by window size.
    pub per_window: Vec<WindowAggregate>,
    /// Full output column list (input columns plus derived).
    pub columns: Vec<String>,
    /// RFC 3339 timestamp of when the stage ran.
    pub generated_at: String,
}

/// Column names appended to the input columns in the output tables.
pub const DERIVED_COLUMNS: [&str; 11] = [
    "source_folder",
    "window_mz",
    "replicate",
    "run_name",
    "scan_number",
    "charge",
    "window_category",
    "spectrum_key",
    "psm_count",
    "is_chimeric",
    "peptide_length",
];

/// Compute summary statistics for a fully annotated table.
pub fn compute_summary(table: &PsmTable) -> SummaryStats {
    let mut spectra: HashMap<&str, bool> = HashMap::new();
    let mut runs: HashMap<&str, ()> = HashMap::new();
    // Positive floats sort correctly by bit pattern.
    let mut windows: BTreeMap<u64, (u64, HashMap<&str, ()>, u64)> = BTreeMap::new();

    for record in &table.records {
        if let Some(key) = record.spectrum_key.as_deref() {
            let chimeric = spectra.entry(key).or_insert(false);
            *chimeric = *chimeric || record.is_chimeric;
        }
        if let Some(run) = record.run_name.as_deref() {
            runs.entry(run).or_insert(());
        }
        if let Some(window) = record.window_mz {
            let entry = windows
                .entry(window.to_bits())
                .or_insert_with(|| (0, HashMap::new(), 0));
            entry.0 += 1;
            if let Some(key) = record.spectrum_key.as_deref() {
                entry.1.entry(key).or_insert(());
            }
            if record.is_chimeric {
                entry.2 += 1;
            }
        }
    }

    let n_psm = table.len() as u64;
    let n_spectra = spectra.len() as u64;
    let n_chimeric_spectra = spectra.values().filter(|&&c| c).count() as u64;

    let per_window: Vec<WindowAggregate> = windows
        .iter()
        .map(|(&bits, (psm_count, unique, chimeric))| WindowAggregate {
            window_mz: f64::from_bits(bits),
            psm_count: *psm_count,
            unique_spectra: unique.len() as u64,
            chimeric_fraction: if *psm_count > 0 {
                *chimeric as f64 / *psm_count as f64
            } else {
                0.0
            },
        })
        .collect();

    let mut columns = table.columns.clone();
    columns.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));

    SummaryStats {
        n_psm,
        n_spectra,
        n_runs: runs.len() as u64,
        n_chimeric_spectra,
        avg_psm_per_spectrum: if n_spectra > 0 {
            n_psm as f64 / n_spectra as f64
        } else {
            0.0
        },
        window_sizes: per_window.iter().map(|w| w.window_mz).collect(),
        per_window,
        columns,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}
