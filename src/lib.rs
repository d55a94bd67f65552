//! # psmprep - Proteomics PSM Data Preparation
//!
//! `psmprep` prepares peptide-spectrum-match (PSM) identification data for
//! downstream chimeric-spectrum analysis. The core stage ingests per-run
//! `psm.tsv` tables, assigns every row a globally unique spectrum key, and
//! writes consolidated tables plus a spectrum-to-run lookup.
//!
//! ## Why the spectrum key matters
//!
//! Scan numbers are only unique within a single acquisition run. Keying
//! spectra by scan number alone silently merges unrelated spectra from
//! different runs. `psmprep` keys every spectrum as `run_name::scan_number`,
//! which is unique across the whole dataset.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use psmprep::loader::{BatchLoader, BatchLoaderConfig};
//! use psmprep::aggregate::{add_derived_columns, compute_summary};
//! use psmprep::output::write_outputs;
//!
//! let config = BatchLoaderConfig::new("raw_data/fragpipe");
//! let loader = BatchLoader::new(config);
//!
//! let files = loader.discover()?;
//! let mut batch = loader.load(&files)?;
//!
//! add_derived_columns(&mut batch.table);
//! let stats = compute_summary(&batch.table);
//! write_outputs(&batch.table, &stats, "processed_data".as_ref())?;
//! # Ok::<(), psmprep::psm::IngestError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`parse`]: folder-name metadata, spectrum-identifier parsing, key construction
//! - [`psm`]: record/table types and single-file TSV loading
//! - [`loader`]: input discovery, exclusion rules, parallel batch loading
//! - [`aggregate`]: derived columns and summary statistics
//! - [`report`]: human-readable ingestion report
//! - [`output`]: consolidated table, chimeric subset, lookup, stats persistence
//! - [`tools`]: batch drivers for external converters and feature detectors
//!
//! ## Output schema
//!
//! The consolidated table keeps every input column and appends:
//!
//! | Column | Type | Description |
//! |--------|------|-------------|
//! | source_folder | String | Immediate parent folder of the input file |
//! | window_mz | Float64 | Acquisition isolation window (m/z) |
//! | replicate | UInt32 | Replicate index from the folder name |
//! | run_name | String | Originating run, parsed from the Spectrum column |
//! | scan_number | UInt64 | Scan number within the run |
//! | charge | Int16 | Charge state from the Spectrum column |
//! | window_category | String | narrow / medium / wide |
//! | spectrum_key | String | `run_name::scan_number`, globally unique |
//! | psm_count | UInt64 | PSMs sharing this spectrum key |
//! | is_chimeric | Bool | psm_count >= 2 |
//! | peptide_length | UInt64 | Sequence length after stripping modifications |

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod aggregate;
pub mod loader;
pub mod output;
pub mod parse;
pub mod psm;
pub mod report;
pub mod tools;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::aggregate::{
        add_derived_columns, compute_summary, spectrum_to_run, SummaryStats, WindowAggregate,
        WindowCategory,
    };
    pub use crate::loader::{BatchLoader, BatchLoaderConfig, BatchResult, FileFailure};
    pub use crate::output::{write_outputs, OutputPaths};
    pub use crate::parse::{
        parse_folder_name, parse_spectrum_id, spectrum_key, FolderMeta, SpectrumId, KEY_DELIMITER,
    };
    pub use crate::psm::{IngestError, PsmRecord, PsmTable, PEPTIDE_COLUMN, SPECTRUM_COLUMN};
    pub use crate::report::IngestReport;
    pub use crate::tools::{BiosaurRunner, RawConverter, RunOutcome, ToolError, ToolRun};
}
