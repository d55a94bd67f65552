//! Input discovery and parallel batch loading.
//!
//! Each worker owns exactly one file and its resulting table; there is no
//! shared mutable state and no locking. A file that fails to parse is
//! dropped from the batch with a logged reason. Workers buffer their log
//! events and the coordinator emits them after the pool joins, so output
//! never interleaves.

use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;

use crate::psm::{load_psm_file, IngestError, PsmTable};

/// File name of a per-run identification table.
pub const PSM_FILE_NAME: &str = "psm.tsv";

/// Default name of the library/reference folder excluded from loading.
pub const DEFAULT_EXCLUDE_FOLDER: &str = "lib";

/// Configuration for the batch loader.
#[derive(Debug, Clone)]
pub struct BatchLoaderConfig {
    /// Directory tree containing `psm.tsv` files.
    pub psm_dir: PathBuf,
    /// Folder name whose contents are skipped (library/reference runs).
    pub exclude_folder: String,
    /// Number of worker threads (defaults to available parallelism).
    pub num_workers: usize,
}

impl BatchLoaderConfig {
    /// Configuration with default exclusion and worker count.
    pub fn new<P: Into<PathBuf>>(psm_dir: P) -> Self {
        Self {
            psm_dir: psm_dir.into(),
            exclude_folder: DEFAULT_EXCLUDE_FOLDER.to_string(),
            num_workers: default_workers(),
        }
    }

    /// Override the worker count, clamped to at least one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers.max(1);
        self
    }

    /// Override the excluded folder name.
    pub fn with_exclude<S: Into<String>>(mut self, exclude: S) -> Self {
        self.exclude_folder = exclude.into();
        self
    }
}

/// Worker count when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// A file dropped from the batch, with the reason.
#[derive(Debug)]
pub struct FileFailure {
    /// The file that failed to load.
    pub path: PathBuf,
    /// Human-readable reason.
    pub reason: String,
}

/// Outcome of a batch load.
#[derive(Debug)]
pub struct BatchResult {
    /// Consolidated table over all successfully loaded files.
    pub table: PsmTable,
    /// Number of files that loaded successfully.
    pub files_loaded: usize,
    /// Files dropped from the batch.
    pub failures: Vec<FileFailure>,
}

/// One worker's result: per-file outcome plus buffered log events.
struct WorkerOutput {
    path: PathBuf,
    outcome: Result<PsmTable, IngestError>,
    events: Vec<String>,
}

/// Parallel loader for a tree of `psm.tsv` files.
pub struct BatchLoader {
    config: BatchLoaderConfig,
}

impl BatchLoader {
    /// Create a loader with the given configuration.
    pub fn new(config: BatchLoaderConfig) -> Self {
        Self { config }
    }

    /// The configuration this loader runs with.
    pub fn config(&self) -> &BatchLoaderConfig {
        &self.config
    }

    /// Discover input files under the configured directory.
    ///
    /// Files with any path component equal to the excluded folder name are
    /// skipped. The result is sorted so downstream output is deterministic
    /// regardless of filesystem enumeration order.
    pub fn discover(&self) -> Result<Vec<PathBuf>, IngestError> {
        if !self.config.psm_dir.is_dir() {
            return Err(IngestError::InputDirNotFound(self.config.psm_dir.clone()));
        }

        let mut files = Vec::new();
        walk_psm_files(&self.config.psm_dir, &self.config.exclude_folder, &mut files)?;
        files.sort();

        if files.is_empty() {
            return Err(IngestError::NoInputFiles(self.config.psm_dir.clone()));
        }

        Ok(files)
    }

    /// Load the given files in parallel and consolidate them.
    ///
    /// Failures are isolated per worker: one bad file is dropped with a
    /// logged reason and the batch proceeds.
    pub fn load(&self, files: &[PathBuf]) -> Result<BatchResult, IngestError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_workers.max(1))
            .build()
            .map_err(|e| IngestError::ThreadPool(e.to_string()))?;

        let outputs: Vec<WorkerOutput> =
            pool.install(|| files.par_iter().map(|path| load_worker(path)).collect());

        // Emit buffered worker events only after the pool has joined.
        let mut tables = Vec::new();
        let mut failures = Vec::new();
        for output in outputs {
            for event in &output.events {
                info!("{event}");
            }
            match output.outcome {
                Ok(table) => tables.push(table),
                Err(err) => {
                    warn!("dropping {}: {err}", output.path.display());
                    failures.push(FileFailure {
                        path: output.path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let files_loaded = tables.len();
        let table = PsmTable::consolidate(tables);

        Ok(BatchResult {
            table,
            files_loaded,
            failures,
        })
    }
}

fn load_worker(path: &Path) -> WorkerOutput {
    let mut events = Vec::new();
    let outcome = load_psm_file(path);
    if let Ok(table) = &outcome {
        events.push(format!(
            "loaded {} rows from {}",
            table.len(),
            path.display()
        ));
    }
    WorkerOutput {
        path: path.to_path_buf(),
        outcome,
        events,
    }
}

fn walk_psm_files(
    dir: &Path,
    exclude: &str,
    files: &mut Vec<PathBuf>,
) -> Result<(), IngestError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();

        if path.is_dir() {
            if name.to_string_lossy() == exclude {
                continue;
            }
            walk_psm_files(&path, exclude, files)?;
        } else if name.to_string_lossy() == PSM_FILE_NAME {
            files.push(path);
        }
    }
    Ok(())
}
