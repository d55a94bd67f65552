//! Batch drivers for external binaries.
//!
//! The conversion and feature-extraction stages are thin wrappers: invoke
//! one external process per input file, in parallel, and record per-file
//! success, skip, or failure. Workers own their file exclusively; a failed
//! file never aborts the batch.

use std::path::{Path, PathBuf};
use std::process::Command;

use rayon::prelude::*;

/// Errors from the external-tool drivers.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tool binary missing on disk
    #[error("tool not found: {}", .0.display())]
    ToolNotFound(PathBuf),

    /// Input directory missing or empty
    #[error("no input files matching *.{extension} under {}", dir.display())]
    NoInputFiles {
        /// Searched directory.
        dir: PathBuf,
        /// Expected file extension.
        extension: String,
    },

    /// Worker pool construction failed
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

/// Per-file outcome of an external-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Tool ran and produced output.
    Completed,
    /// Output already present; nothing to do.
    Skipped(String),
    /// Tool failed; message carries the exit status or stderr excerpt.
    Failed(String),
}

impl RunOutcome {
    /// Whether the file ended in a usable state (completed or skipped).
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// One input file paired with its outcome.
#[derive(Debug)]
pub struct ToolRun {
    /// The input file.
    pub input: PathBuf,
    /// What happened to it.
    pub outcome: RunOutcome,
}

/// List files with the given extension directly under `dir`, sorted.
pub fn list_input_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ToolError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(ToolError::NoInputFiles {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
        });
    }

    Ok(files)
}

/// Run `worker` over every file on a bounded pool, collecting outcomes.
///
/// Outcomes come back in input order; logging happens at the call site
/// after the pool joins.
pub fn run_batch<F>(files: &[PathBuf], jobs: usize, worker: F) -> Result<Vec<ToolRun>, ToolError>
where
    F: Fn(&Path) -> RunOutcome + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| ToolError::ThreadPool(e.to_string()))?;

    let runs = pool.install(|| {
        files
            .par_iter()
            .map(|path| ToolRun {
                input: path.clone(),
                outcome: worker(path),
            })
            .collect()
    });

    Ok(runs)
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn run_command(mut command: Command) -> RunOutcome {
    match command.output() {
        Ok(output) if output.status.success() => RunOutcome::Completed,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt = truncate(stderr.trim(), 200);
            if excerpt.is_empty() {
                RunOutcome::Failed(format!("exit status {}", output.status))
            } else {
                RunOutcome::Failed(format!("{}: {excerpt}", output.status))
            }
        }
        Err(err) => RunOutcome::Failed(err.to_string()),
    }
}

/// Driver for ThermoRawFileParser: Thermo RAW to indexed mzML.
#[derive(Debug, Clone)]
pub struct RawConverter {
    /// ThermoRawFileParser executable (or wrapper script).
    pub parser: PathBuf,
    /// Optional Singularity image; when set, the parser runs inside
    /// `singularity exec <image>`.
    pub container: Option<PathBuf>,
    /// Directory receiving the mzML files.
    pub output_dir: PathBuf,
    /// Whether to let the parser centroid the spectra.
    pub peak_picking: bool,
}

impl RawConverter {
    /// Verify the tool exists and the output directory can be created.
    pub fn validate(&self) -> Result<(), ToolError> {
        if let Some(container) = &self.container {
            if !container.exists() {
                return Err(ToolError::ToolNotFound(container.clone()));
            }
        } else if !self.parser.exists() {
            return Err(ToolError::ToolNotFound(self.parser.clone()));
        }
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Convert one RAW file; the parser names the output itself.
    pub fn convert_file(&self, raw_file: &Path) -> RunOutcome {
        let mut command = match &self.container {
            Some(image) => {
                let mut cmd = Command::new("singularity");
                cmd.arg("exec").arg(image).arg(&self.parser);
                cmd
            }
            None => Command::new(&self.parser),
        };

        command
            .arg(format!("-i={}", raw_file.display()))
            .arg(format!("-o={}", self.output_dir.display()))
            .arg("-f=2"); // indexed mzML

        if !self.peak_picking {
            command.arg("-p");
        }

        run_command(command)
    }
}

/// Driver for Biosaur2 MS1 feature detection over mzML files.
#[derive(Debug, Clone)]
pub struct BiosaurRunner {
    /// Biosaur2 executable.
    pub binary: PathBuf,
    /// Directory receiving `<stem>.features.tsv` files.
    pub output_dir: PathBuf,
    /// Worker threads handed to each Biosaur2 process.
    pub threads_per_file: usize,
    /// Minimum intensity threshold; low signals are skipped for speed.
    pub min_intensity: u64,
}

impl BiosaurRunner {
    /// Verify the tool exists and the output directory can be created.
    pub fn validate(&self) -> Result<(), ToolError> {
        if !self.binary.exists() {
            return Err(ToolError::ToolNotFound(self.binary.clone()));
        }
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Feature table path for an mzML input.
    pub fn output_for(&self, mzml_file: &Path) -> PathBuf {
        let stem = mzml_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_dir.join(format!("{stem}.features.tsv"))
    }

    /// Extract features from one mzML file, skipping work already done.
    pub fn extract_file(&self, mzml_file: &Path) -> RunOutcome {
        let output_file = self.output_for(mzml_file);

        // A prior run's output counts only when non-trivially sized.
        if let Ok(meta) = std::fs::metadata(&output_file) {
            if meta.len() > 1000 {
                return RunOutcome::Skipped("output already exists".to_string());
            }
        }

        let mut command = Command::new(&self.binary);
        command
            .arg(mzml_file)
            .arg("-o")
            .arg(&output_file)
            .arg("-nprocs")
            .arg(self.threads_per_file.to_string())
            .arg("-mini")
            .arg(self.min_intensity.to_string());

        match run_command(command) {
            RunOutcome::Completed => {
                // Verify the tool actually produced a feature table.
                match std::fs::metadata(&output_file) {
                    Ok(meta) if meta.len() > 100 => RunOutcome::Completed,
                    _ => RunOutcome::Failed("output file empty or missing".to_string()),
                }
            }
            other => other,
        }
    }
}
