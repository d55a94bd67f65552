//! The `extract` subcommand: batch Biosaur2 feature detection.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};

use psmprep::tools::{list_input_files, run_batch, BiosaurRunner, RunOutcome};

pub fn run(
    mzml_dir: PathBuf,
    output_dir: PathBuf,
    biosaur: PathBuf,
    jobs: usize,
    threads_per_file: usize,
    min_intensity: u64,
) -> Result<()> {
    let runner = BiosaurRunner {
        binary: biosaur,
        output_dir: output_dir.clone(),
        threads_per_file,
        min_intensity,
    };
    runner.validate().context("Feature extractor setup failed")?;

    let files = list_input_files(&mzml_dir, "mzML")
        .with_context(|| format!("No mzML files under {}", mzml_dir.display()))?;

    info!(
        "Extracting features from {} mzML files ({} jobs x {} threads)",
        files.len(),
        jobs,
        threads_per_file
    );

    let start = Instant::now();
    let runs = run_batch(&files, jobs, |path| runner.extract_file(path))?;
    let elapsed = start.elapsed().as_secs_f64();

    let mut completed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    for run in &runs {
        let name = run.input.file_name().unwrap_or_default().to_string_lossy();
        match &run.outcome {
            RunOutcome::Completed => {
                info!("extracted {name}");
                completed += 1;
            }
            RunOutcome::Skipped(reason) => {
                info!("skipped {name}: {reason}");
                skipped += 1;
            }
            RunOutcome::Failed(reason) => {
                warn!("failed {name}: {reason}");
                failed += 1;
            }
        }
    }

    println!(
        "Feature extraction: {completed} completed, {skipped} skipped, {failed} failed in {:.1} min",
        elapsed / 60.0
    );
    println!("Output directory: {}", output_dir.display());

    if failed > 0 {
        anyhow::bail!("{failed} files failed feature extraction");
    }

    Ok(())
}
