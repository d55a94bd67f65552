//! # psmprep
//!
//! Command-line entry point for the PSM data-preparation pipeline.
//!
//! ```bash
//! # Ingest psm.tsv tables with corrected spectrum indexing
//! psmprep -v ingest --psm-dir raw_data/fragpipe --output-dir processed_data
//!
//! # Batch-convert Thermo RAW files to mzML
//! psmprep convert --input-dir raw --output-dir mzML --parser ThermoRawFileParser.sh
//!
//! # Batch feature detection over mzML files
//! psmprep extract --mzml-dir mzML --output-dir features --biosaur biosaur2
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
