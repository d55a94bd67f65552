//! End-to-end tests for the PSM ingestion stage.
//!
//! These build a synthetic fragpipe-style directory tree of psm.tsv files
//! and run discovery, parallel loading, aggregation, and persistence over
//! it.

use std::path::Path;

use proptest::prelude::*;
use tempfile::tempdir;

use psmprep::aggregate::{add_derived_columns, compute_summary, spectrum_to_run};
use psmprep::loader::{BatchLoader, BatchLoaderConfig};
use psmprep::output::{read_lookup, write_outputs};
use psmprep::parse::spectrum_key;

fn write_psm_tsv(root: &Path, folder: &str, body: &str) {
    let dir = root.join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("psm.tsv"), body).unwrap();
}

/// Two runs with an identical scan number must never share a spectrum key.
#[test]
fn test_keys_do_not_collide_across_runs() {
    let root = tempdir().unwrap();
    write_psm_tsv(
        root.path(),
        "118_60_1_6mz_1",
        "Spectrum\tPeptide\nRunA.00988.00988.2\tPEPTIDE\n",
    );
    write_psm_tsv(
        root.path(),
        "118_60_1_6mz_2",
        "Spectrum\tPeptide\nRunB.00988.00988.2\tPEPTIDE\n",
    );

    let loader = BatchLoader::new(BatchLoaderConfig::new(root.path()).with_workers(2));
    let files = loader.discover().unwrap();
    let mut batch = loader.load(&files).unwrap();
    add_derived_columns(&mut batch.table);

    let keys: Vec<&str> = batch
        .table
        .records
        .iter()
        .filter_map(|r| r.spectrum_key.as_deref())
        .collect();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);

    // Both scans are 988, so a scan-only key would collide.
    assert!(batch
        .table
        .records
        .iter()
        .all(|r| r.scan_number == Some(988)));

    // Neither record is chimeric: each key has exactly one PSM.
    assert!(batch.table.records.iter().all(|r| !r.is_chimeric));

    let lookup = spectrum_to_run(&batch.table);
    assert_eq!(lookup.len(), 2);
    assert_eq!(lookup.get("RunA::988").map(String::as_str), Some("RunA"));
    assert_eq!(lookup.get("RunB::988").map(String::as_str), Some("RunB"));
}

/// Folder metadata flows onto every row of the folder's table.
#[test]
fn test_folder_metadata_annotation() {
    let root = tempdir().unwrap();
    write_psm_tsv(
        root.path(),
        "118_60_1_6mz_1",
        "Spectrum\nRunA.1.1.2\nRunA.2.2.2\n",
    );
    write_psm_tsv(root.path(), "86_45_24mz_2", "Spectrum\nRunB.1.1.3\n");

    let loader = BatchLoader::new(BatchLoaderConfig::new(root.path()));
    let files = loader.discover().unwrap();
    let mut batch = loader.load(&files).unwrap();
    add_derived_columns(&mut batch.table);

    for record in &batch.table.records {
        match record.source_folder.as_str() {
            "118_60_1_6mz_1" => {
                assert_eq!(record.window_mz, Some(1.6));
                assert_eq!(record.replicate, Some(1));
                assert_eq!(record.window_category.map(|c| c.as_str()), Some("narrow"));
            }
            "86_45_24mz_2" => {
                assert_eq!(record.window_mz, Some(24.0));
                assert_eq!(record.replicate, Some(2));
                assert_eq!(record.window_category.map(|c| c.as_str()), Some("wide"));
            }
            other => panic!("unexpected source folder {other}"),
        }
    }
}

/// Rows with malformed identifiers survive with absent derived fields.
#[test]
fn test_malformed_rows_are_kept_not_dropped() {
    let root = tempdir().unwrap();
    write_psm_tsv(
        root.path(),
        "86_45_24mz_1",
        "Spectrum\tPeptide\nRunA.1.1.2\tPEP\nbad_identifier\tTIDE\n",
    );

    let loader = BatchLoader::new(BatchLoaderConfig::new(root.path()));
    let files = loader.discover().unwrap();
    let mut batch = loader.load(&files).unwrap();
    add_derived_columns(&mut batch.table);

    assert_eq!(batch.table.len(), 2);
    let bad = &batch.table.records[1];
    assert!(bad.spectrum_key.is_none());
    assert!(bad.psm_count.is_none());
    // Original fields and key-independent derivations still present.
    assert_eq!(bad.raw_fields[1], "TIDE");
    assert_eq!(bad.peptide_length, Some(4));

    // The malformed row is excluded from key-dependent aggregates.
    let stats = compute_summary(&batch.table);
    assert_eq!(stats.n_psm, 2);
    assert_eq!(stats.n_spectra, 1);
}

/// Three PSMs on one spectrum, one on another: chimeric flags and counts.
#[test]
fn test_chimericity_end_to_end() {
    let root = tempdir().unwrap();
    write_psm_tsv(
        root.path(),
        "118_60_1_6mz_1",
        "Spectrum\tPeptide\n\
         RunA.10.10.2\tAAAA\n\
         RunA.10.10.3\tBBBB\n\
         RunA.10.10.2\tCCCC\n\
         RunA.11.11.2\tDDDD\n",
    );

    let loader = BatchLoader::new(BatchLoaderConfig::new(root.path()));
    let files = loader.discover().unwrap();
    let mut batch = loader.load(&files).unwrap();
    add_derived_columns(&mut batch.table);

    let shared: Vec<_> = batch
        .table
        .records
        .iter()
        .filter(|r| r.spectrum_key.as_deref() == Some("RunA::10"))
        .collect();
    assert_eq!(shared.len(), 3);
    for record in &shared {
        assert_eq!(record.psm_count, Some(3));
        assert!(record.is_chimeric);
    }

    let unique: Vec<_> = batch
        .table
        .records
        .iter()
        .filter(|r| r.spectrum_key.as_deref() == Some("RunA::11"))
        .collect();
    assert_eq!(unique.len(), 1);
    assert_eq!(unique[0].psm_count, Some(1));
    assert!(!unique[0].is_chimeric);

    let stats = compute_summary(&batch.table);
    assert_eq!(stats.n_chimeric_spectra, 1);
}

/// Loading the same inputs twice, in either file order, yields set-equal
/// consolidated output.
#[test]
fn test_idempotent_order_independent_load() {
    let root = tempdir().unwrap();
    write_psm_tsv(
        root.path(),
        "118_60_1_6mz_1",
        "Spectrum\tPeptide\nRunA.1.1.2\tAA\nRunA.2.2.2\tBB\n",
    );
    write_psm_tsv(
        root.path(),
        "86_45_24mz_2",
        "Spectrum\tPeptide\nRunB.1.1.3\tCC\n",
    );
    write_psm_tsv(
        root.path(),
        "86_45_12mz_1",
        "Spectrum\tPeptide\nRunC.9.9.2\tDD\n",
    );

    let loader = BatchLoader::new(BatchLoaderConfig::new(root.path()).with_workers(3));
    let files = loader.discover().unwrap();
    let mut reversed = files.clone();
    reversed.reverse();

    let row_set = |files: &[std::path::PathBuf]| {
        let mut batch = loader.load(files).unwrap();
        add_derived_columns(&mut batch.table);
        let mut rows: Vec<String> = batch
            .table
            .records
            .iter()
            .map(|r| {
                format!(
                    "{}|{}|{}|{:?}",
                    r.raw_fields.join(","),
                    r.source_folder,
                    r.spectrum_key.clone().unwrap_or_default(),
                    r.psm_count
                )
            })
            .collect();
        rows.sort();
        rows
    };

    let first = row_set(&files);
    let second = row_set(&reversed);
    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
}

/// Files under the excluded folder never reach the consolidated output.
#[test]
fn test_library_folder_exclusion() {
    let root = tempdir().unwrap();
    write_psm_tsv(root.path(), "118_60_1_6mz_1", "Spectrum\nRunA.1.1.2\n");
    write_psm_tsv(root.path(), "lib", "Spectrum\nLibraryRun.1.1.2\n");

    let loader = BatchLoader::new(BatchLoaderConfig::new(root.path()));
    let files = loader.discover().unwrap();
    let batch = loader.load(&files).unwrap();

    assert_eq!(batch.files_loaded, 1);
    assert!(batch
        .table
        .records
        .iter()
        .all(|r| r.run_name.as_deref() != Some("LibraryRun")));
}

/// Full pipeline into output files, then read the lookup back.
#[test]
fn test_pipeline_outputs_round_trip() {
    let root = tempdir().unwrap();
    write_psm_tsv(
        root.path(),
        "118_60_1_6mz_1",
        "Spectrum\tPeptide\tHyperscore\n\
         RunA.10.10.2\tPEPT[79.9663]IDEK\t25.0\n\
         RunA.10.10.3\tOTHERSEQ\t18.2\n",
    );

    let loader = BatchLoader::new(BatchLoaderConfig::new(root.path()));
    let files = loader.discover().unwrap();
    let mut batch = loader.load(&files).unwrap();
    add_derived_columns(&mut batch.table);
    let stats = compute_summary(&batch.table);

    let out_dir = root.path().join("processed_data");
    let paths = write_outputs(&batch.table, &stats, &out_dir).unwrap();

    // Both rows share RunA::10, so the chimeric subset equals the full table.
    let clean = std::fs::read_to_string(&paths.clean_table).unwrap();
    let chimeric = std::fs::read_to_string(&paths.chimeric_table).unwrap();
    assert_eq!(clean.lines().count(), 3);
    assert_eq!(chimeric.lines().count(), 3);

    // Modification annotation stripped before measuring length.
    let first_row = clean.lines().nth(1).unwrap();
    assert!(first_row.ends_with(",8"));

    let lookup = read_lookup(&paths.lookup).unwrap();
    assert_eq!(lookup.len(), 1);
    assert_eq!(lookup.get("RunA::10").map(String::as_str), Some("RunA"));
}

proptest! {
    /// Key construction is stable and collision-free across distinct
    /// (run, scan) pairs.
    #[test]
    fn prop_key_stable_and_unique(
        run_a in "[A-Za-z0-9_]{1,16}",
        run_b in "[A-Za-z0-9_]{1,16}",
        scan in 0u64..1_000_000,
    ) {
        prop_assert_eq!(spectrum_key(&run_a, scan), spectrum_key(&run_a, scan));
        if run_a != run_b {
            prop_assert_ne!(spectrum_key(&run_a, scan), spectrum_key(&run_b, scan));
        }
    }

    /// Parsing a well-formed identifier recovers run, scan, and charge.
    #[test]
    fn prop_identifier_round_trip(
        run in "[A-Za-z0-9_]{1,16}(\\.[A-Za-z0-9_]{1,8}){0,2}",
        scan in 0u64..1_000_000,
        charge in 1i16..8,
    ) {
        let spectrum = format!("{run}.{scan:05}.{scan:05}.{charge}");
        let id = psmprep::parse::parse_spectrum_id(&spectrum).unwrap();
        prop_assert_eq!(id.run_name, run);
        prop_assert_eq!(id.scan_number, scan);
        prop_assert_eq!(id.charge, charge);
    }
}
