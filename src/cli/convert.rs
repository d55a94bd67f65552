//! The `convert` subcommand: batch Thermo RAW to mzML conversion.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};

use psmprep::tools::{list_input_files, run_batch, RawConverter, RunOutcome};

pub fn run(
    input_dir: PathBuf,
    output_dir: PathBuf,
    parser: PathBuf,
    container: Option<PathBuf>,
    jobs: usize,
    no_peak_picking: bool,
) -> Result<()> {
    let converter = RawConverter {
        parser,
        container,
        output_dir: output_dir.clone(),
        peak_picking: !no_peak_picking,
    };
    converter.validate().context("Converter setup failed")?;

    let files = list_input_files(&input_dir, "raw")
        .with_context(|| format!("No RAW files under {}", input_dir.display()))?;

    info!("Converting {} RAW files with {} jobs", files.len(), jobs);

    let start = Instant::now();
    let runs = run_batch(&files, jobs, |path| converter.convert_file(path))?;
    let elapsed = start.elapsed().as_secs_f64();

    let mut failed = 0usize;
    for run in &runs {
        let name = run.input.file_name().unwrap_or_default().to_string_lossy();
        match &run.outcome {
            RunOutcome::Completed => info!("converted {name}"),
            RunOutcome::Skipped(reason) => info!("skipped {name}: {reason}"),
            RunOutcome::Failed(reason) => {
                warn!("failed {name}: {reason}");
                failed += 1;
            }
        }
    }

    println!(
        "Converted {}/{} files in {:.1} min ({} failed)",
        runs.len() - failed,
        runs.len(),
        elapsed / 60.0,
        failed
    );

    if failed > 0 {
        anyhow::bail!("{failed} files failed to convert");
    }

    Ok(())
}
