use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod convert;
mod extract;
mod ingest;

/// psmprep - Proteomics PSM Data Preparation Pipeline
#[derive(Parser)]
#[command(name = "psmprep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load psm.tsv tables with corrected spectrum indexing
    Ingest {
        /// Directory tree containing psm.tsv files
        #[arg(long, value_name = "DIR")]
        psm_dir: Option<PathBuf>,

        /// Output directory (default: processed_data)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Number of worker threads (default: available cores)
        #[arg(short = 'j', long, value_name = "N")]
        workers: Option<usize>,

        /// Folder name to exclude (library/reference runs)
        #[arg(long, value_name = "NAME")]
        exclude: Option<String>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Report discovered input files without loading them
        #[arg(long)]
        dry_run: bool,
    },

    /// Convert Thermo RAW files to mzML via ThermoRawFileParser
    Convert {
        /// Directory containing RAW files
        #[arg(short, long, value_name = "DIR")]
        input_dir: PathBuf,

        /// Output directory for mzML files
        #[arg(short, long, value_name = "DIR")]
        output_dir: PathBuf,

        /// ThermoRawFileParser executable or wrapper script
        #[arg(long, value_name = "BIN", default_value = "ThermoRawFileParser.sh")]
        parser: PathBuf,

        /// Singularity image to run the parser in
        #[arg(short, long, value_name = "SIF")]
        container: Option<PathBuf>,

        /// Number of parallel conversions
        #[arg(short = 'j', long, value_name = "N", default_value = "4")]
        jobs: usize,

        /// Disable peak picking (keep profile spectra)
        #[arg(short = 'p', long)]
        no_peak_picking: bool,
    },

    /// Run Biosaur2 MS1 feature detection over mzML files
    Extract {
        /// Directory containing mzML files
        #[arg(short, long, value_name = "DIR")]
        mzml_dir: PathBuf,

        /// Output directory for feature tables
        #[arg(short, long, value_name = "DIR")]
        output_dir: PathBuf,

        /// Biosaur2 executable
        #[arg(long, value_name = "BIN", default_value = "biosaur2")]
        biosaur: PathBuf,

        /// Number of files processed simultaneously
        #[arg(short = 'j', long, value_name = "N", default_value = "4")]
        jobs: usize,

        /// Worker threads handed to each Biosaur2 process
        #[arg(long, value_name = "N", default_value = "8")]
        threads_per_file: usize,

        /// Minimum intensity threshold
        #[arg(long, value_name = "I", default_value = "1000")]
        min_intensity: u64,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest {
            psm_dir,
            output_dir,
            workers,
            exclude,
            config,
            dry_run,
        } => ingest::run(psm_dir, output_dir, workers, exclude, config, dry_run),
        Commands::Convert {
            input_dir,
            output_dir,
            parser,
            container,
            jobs,
            no_peak_picking,
        } => convert::run(input_dir, output_dir, parser, container, jobs, no_peak_picking),
        Commands::Extract {
            mzml_dir,
            output_dir,
            biosaur,
            jobs,
            threads_per_file,
            min_intensity,
        } => extract::run(
            mzml_dir,
            output_dir,
            biosaur,
            jobs,
            threads_per_file,
            min_intensity,
        ),
    }
}
