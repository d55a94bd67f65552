//! The `ingest` subcommand: load PSM tables with corrected spectrum keys.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;

use psmprep::aggregate::{add_derived_columns, compute_summary};
use psmprep::loader::{BatchLoader, BatchLoaderConfig, DEFAULT_EXCLUDE_FOLDER};
use psmprep::output::write_outputs;
use psmprep::parse::parse_folder_name;
use psmprep::report::IngestReport;

use super::config::Config;

const DEFAULT_OUTPUT_DIR: &str = "processed_data";

pub fn run(
    psm_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    workers: Option<usize>,
    exclude: Option<String>,
    config_path: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let file_config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // CLI flags take precedence over config file values.
    let psm_dir = psm_dir.or(file_config.ingest.psm_dir);
    let output_dir = output_dir
        .or(file_config.ingest.output_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let exclude = exclude
        .or(file_config.ingest.exclude)
        .unwrap_or_else(|| DEFAULT_EXCLUDE_FOLDER.to_string());

    let Some(psm_dir) = psm_dir else {
        anyhow::bail!(
            "No PSM directory specified.\n\
             Pass one with: psmprep ingest --psm-dir /path/to/fragpipe/\n\
             or set psm_dir under [ingest] in a config file (--config psmprep.toml)."
        );
    };

    if !psm_dir.is_dir() {
        anyhow::bail!(
            "PSM directory not found: {}\n\
             Pass an existing directory with: psmprep ingest --psm-dir /path/to/fragpipe/",
            psm_dir.display()
        );
    }

    let mut loader_config = BatchLoaderConfig::new(&psm_dir).with_exclude(exclude);
    if let Some(workers) = workers.or(file_config.ingest.workers) {
        loader_config = loader_config.with_workers(workers);
    }

    info!("PSM ingestion with corrected spectrum keys");
    info!("  PSM dir:    {}", psm_dir.display());
    info!("  Output dir: {}", output_dir.display());
    info!("  Workers:    {}", loader_config.num_workers);
    info!("  Excluding:  {}", loader_config.exclude_folder);

    let loader = BatchLoader::new(loader_config);
    let files = loader
        .discover()
        .with_context(|| format!("Failed to discover psm.tsv files under {}", psm_dir.display()))?;

    println!("Found {} PSM files", files.len());

    let listing = describe_inputs(&files);

    if dry_run {
        // Dry run reports every discovered file, not a preview.
        for line in &listing {
            println!("  {line}");
        }
        println!("[dry run] would load {} files", files.len());
        return Ok(());
    }

    for line in listing.iter().take(5) {
        println!("  {line}");
    }
    if listing.len() > 5 {
        println!("  ... and {} more", listing.len() - 5);
    }

    let start = Instant::now();
    let mut batch = loader.load(&files).context("Batch load failed")?;
    info!(
        "loaded {} files ({} PSMs) in {:.1}s",
        batch.files_loaded,
        batch.table.len(),
        start.elapsed().as_secs_f64()
    );

    add_derived_columns(&mut batch.table);
    let stats = compute_summary(&batch.table);

    let report = IngestReport {
        stats,
        files_loaded: batch.files_loaded,
        failures: batch.failures,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };

    #[cfg(feature = "colorized_output")]
    println!("{}", report.format_colored());

    #[cfg(not(feature = "colorized_output"))]
    println!("{report}");

    let paths = write_outputs(&batch.table, &report.stats, &output_dir)
        .with_context(|| format!("Failed to write outputs to {}", output_dir.display()))?;

    println!("Outputs:");
    println!("  {}", paths.clean_table.display());
    println!("  {}", paths.chimeric_table.display());
    println!("  {}", paths.lookup.display());
    println!("  {}", paths.stats.display());

    Ok(())
}

/// One line per discovered file: the path plus the folder's parsed
/// window and replicate, `?` where the folder name does not match.
fn describe_inputs(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|file| {
            let folder = file
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let meta = parse_folder_name(&folder);
            format!(
                "{} (window={}, replicate={})",
                file.display(),
                meta.window_mz
                    .map(|w| format!("{w} m/z"))
                    .unwrap_or_else(|| "?".to_string()),
                meta.replicate
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "?".to_string())
            )
        })
        .collect()
}
