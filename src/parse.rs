//! Parsers for run-folder names and composite spectrum identifiers, plus
//! spectrum key construction.
//!
//! Run folders encode the acquisition isolation window and replicate index,
//! e.g. `118_60_1_6mz_1` (window 1.6 m/z, replicate 1) or `86_45_24mz_2`
//! (window 24 m/z, replicate 2). The decimal pattern must be tried before
//! the integer pattern: `1_6mz` would otherwise be misread as window 6.
//!
//! The `Spectrum` column of a FragPipe PSM table is
//! `<run>.<scan>.<scan>.<charge>`, where the run name may itself contain
//! dots, so it is split from the right.

use std::sync::LazyLock;

use regex::Regex;

/// Delimiter between run name and scan number in a spectrum key.
///
/// Run names are filename stems and scan numbers are integers, so `::`
/// cannot occur inside either component.
pub const KEY_DELIMITER: &str = "::";

// Decimal window encoded with an underscore: 118_60_1_6mz_1 -> 1.6
static DECIMAL_FOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)_(\d+)_(\d+)_(\d+)mz_(\d+)$").expect("decimal folder pattern")
});

// Integer window: 86_45_24mz_2 -> 24
static INTEGER_FOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)_(\d+)_(\d+)mz_(\d+)$").expect("integer folder pattern")
});

/// Acquisition metadata parsed from a run folder name.
///
/// Both fields are absent when no naming pattern matches; an unparseable
/// folder still contributes its rows, just without window/replicate
/// annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FolderMeta {
    /// Isolation window width in m/z.
    pub window_mz: Option<f64>,
    /// Replicate index (positive integer).
    pub replicate: Option<u32>,
}

/// Extract the acquisition window and replicate index from a folder name.
///
/// Patterns are tried from most to least specific; the decimal form is
/// distinguished from the integer form by pattern order, not magnitude.
pub fn parse_folder_name(folder_name: &str) -> FolderMeta {
    if let Some(caps) = DECIMAL_FOLDER.captures(folder_name) {
        let window = format!("{}.{}", &caps[3], &caps[4]).parse::<f64>().ok();
        let replicate = caps[5].parse::<u32>().ok();
        if window.is_some() && replicate.is_some() {
            return FolderMeta {
                window_mz: window,
                replicate,
            };
        }
    }

    if let Some(caps) = INTEGER_FOLDER.captures(folder_name) {
        let window = caps[3].parse::<f64>().ok();
        let replicate = caps[4].parse::<u32>().ok();
        if window.is_some() && replicate.is_some() {
            return FolderMeta {
                window_mz: window,
                replicate,
            };
        }
    }

    FolderMeta::default()
}

/// Components of a composite spectrum identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrumId {
    /// Originating run (mzML stem); may contain dots.
    pub run_name: String,
    /// Scan number within the run.
    pub scan_number: u64,
    /// Charge state.
    pub charge: i16,
}

/// Parse a `<run>.<scan>.<scan>.<charge>` identifier.
///
/// Splits from the right into at most four segments, so dots inside the run
/// name are preserved. Returns `None` for malformed input instead of
/// failing; the middle repeated-scan segment is not validated.
pub fn parse_spectrum_id(spectrum: &str) -> Option<SpectrumId> {
    let mut parts = spectrum.rsplitn(4, '.');
    let charge = parts.next()?.parse::<i16>().ok()?;
    let _scan_repeated = parts.next()?;
    let scan_number = parts.next()?.parse::<u64>().ok()?;
    let run_name = parts.next()?;

    if run_name.is_empty() {
        return None;
    }

    Some(SpectrumId {
        run_name: run_name.to_string(),
        scan_number,
        charge,
    })
}

/// Build the globally unique spectrum key for a (run, scan) pair.
///
/// Scan numbers repeat across runs, so the key must carry the run name; two
/// records with the same scan number in different runs always get distinct
/// keys.
pub fn spectrum_key(run_name: &str, scan_number: u64) -> String {
    format!("{run_name}{KEY_DELIMITER}{scan_number}")
}
