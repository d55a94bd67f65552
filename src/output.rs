//! Persistence of the ingestion outputs.
//!
//! Four outputs, each to a distinct file under the output directory:
//! the full consolidated table, the chimeric subset, the spectrum-key to
//! run-name lookup, and summary statistics. Reruns overwrite prior outputs
//! deterministically; this is a terminal batch step with no transactional
//! guarantee.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::aggregate::{spectrum_to_run, SummaryStats, DERIVED_COLUMNS};
use crate::psm::{IngestError, PsmRecord, PsmTable};

/// File name of the full consolidated table.
pub const CLEAN_TABLE_FILE: &str = "psm_clean.csv";
/// File name of the chimeric-only subset.
pub const CHIMERIC_TABLE_FILE: &str = "psm_chimeric.csv";
/// File name of the spectrum-key to run-name lookup.
pub const LOOKUP_FILE: &str = "spectrum_to_run.json";
/// File name of the summary statistics.
pub const STATS_FILE: &str = "psm_stats.json";

/// Locations of the written outputs.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    /// Full consolidated table.
    pub clean_table: PathBuf,
    /// Chimeric-only subset.
    pub chimeric_table: PathBuf,
    /// Spectrum-key to run-name lookup.
    pub lookup: PathBuf,
    /// Summary statistics.
    pub stats: PathBuf,
}

/// Write all four outputs to `output_dir`, creating it if missing.
pub fn write_outputs(
    table: &PsmTable,
    stats: &SummaryStats,
    output_dir: &Path,
) -> Result<OutputPaths, IngestError> {
    std::fs::create_dir_all(output_dir)?;

    let paths = OutputPaths {
        clean_table: output_dir.join(CLEAN_TABLE_FILE),
        chimeric_table: output_dir.join(CHIMERIC_TABLE_FILE),
        lookup: output_dir.join(LOOKUP_FILE),
        stats: output_dir.join(STATS_FILE),
    };

    write_table(table, &paths.clean_table, |_| true)?;
    info!("wrote {} ({} rows)", paths.clean_table.display(), table.len());

    let n_chimeric = table.records.iter().filter(|r| r.is_chimeric).count();
    write_table(table, &paths.chimeric_table, |r| r.is_chimeric)?;
    info!(
        "wrote {} ({} rows)",
        paths.chimeric_table.display(),
        n_chimeric
    );

    let lookup = spectrum_to_run(table);
    write_json(&lookup, &paths.lookup)?;
    info!("wrote {} ({} spectra)", paths.lookup.display(), lookup.len());

    write_json(stats, &paths.stats)?;
    info!("wrote {}", paths.stats.display());

    Ok(paths)
}

/// Write the table rows selected by `keep` as CSV.
///
/// The header is the input columns followed by the derived columns; absent
/// derived fields serialize as empty strings.
fn write_table<F>(table: &PsmTable, path: &Path, keep: F) -> Result<(), IngestError>
where
    F: Fn(&PsmRecord) -> bool,
{
    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new().from_writer(BufWriter::new(file));

    let mut header: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    header.extend(DERIVED_COLUMNS);
    writer.write_record(&header)?;

    let mut row: Vec<String> = Vec::with_capacity(header.len());
    for record in table.records.iter().filter(|r| keep(r)) {
        row.clear();
        row.extend(record.raw_fields.iter().cloned());
        // Short rows were padded at load time, but guard against mismatch.
        row.resize(table.columns.len(), String::new());

        row.push(record.source_folder.clone());
        row.push(format_opt(record.window_mz));
        row.push(format_opt(record.replicate));
        row.push(record.run_name.clone().unwrap_or_default());
        row.push(format_opt(record.scan_number));
        row.push(format_opt(record.charge));
        row.push(
            record
                .window_category
                .map(|c| c.as_str().to_string())
                .unwrap_or_default(),
        );
        row.push(record.spectrum_key.clone().unwrap_or_default());
        row.push(format_opt(record.psm_count));
        row.push(record.is_chimeric.to_string());
        row.push(format_opt(record.peptide_length));

        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn format_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<(), IngestError> {
    let json = serde_json::to_string_pretty(value)?;
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Read back a spectrum-key lookup written by [`write_outputs`].
///
/// Downstream stages use this to locate the source run for a spectrum
/// without re-reading the consolidated table.
pub fn read_lookup(path: &Path) -> Result<BTreeMap<String, String>, IngestError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{add_derived_columns, compute_summary};
    use crate::psm::load_psm_file;

    #[test]
    fn test_write_and_reread_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("86_45_24mz_1");
        std::fs::create_dir_all(&in_dir).unwrap();
        std::fs::write(
            in_dir.join("psm.tsv"),
            "Spectrum\tPeptide\nRunA.1.1.2\tPEPTIDE\nRunA.1.1.3\tPEPT[79.9663]IDE\n",
        )
        .unwrap();

        let mut table = load_psm_file(&in_dir.join("psm.tsv")).unwrap();
        add_derived_columns(&mut table);
        let stats = compute_summary(&table);

        let out_dir = dir.path().join("processed_data");
        let paths = write_outputs(&table, &stats, &out_dir).unwrap();

        let clean = std::fs::read_to_string(&paths.clean_table).unwrap();
        let mut lines = clean.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Spectrum,Peptide,source_folder"));
        assert!(header.ends_with("peptide_length"));
        assert_eq!(lines.count(), 2);

        // Both rows share RunA::1, so both are chimeric.
        let chimeric = std::fs::read_to_string(&paths.chimeric_table).unwrap();
        assert_eq!(chimeric.lines().count(), 3);

        let lookup = read_lookup(&paths.lookup).unwrap();
        assert_eq!(lookup.get("RunA::1").map(String::as_str), Some("RunA"));

        let stats_json = std::fs::read_to_string(&paths.stats).unwrap();
        let reread: SummaryStats = serde_json::from_str(&stats_json).unwrap();
        assert_eq!(reread.n_psm, 2);
        assert_eq!(reread.n_spectra, 1);
        assert_eq!(reread.n_chimeric_spectra, 1);
    }

    #[test]
    fn test_rerun_overwrites_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("86_45_24mz_1");
        std::fs::create_dir_all(&in_dir).unwrap();
        std::fs::write(in_dir.join("psm.tsv"), "Spectrum\nRunA.5.5.2\n").unwrap();

        let mut table = load_psm_file(&in_dir.join("psm.tsv")).unwrap();
        add_derived_columns(&mut table);
        let stats = compute_summary(&table);

        let out_dir = dir.path().join("out");
        let first = write_outputs(&table, &stats, &out_dir).unwrap();
        let first_clean = std::fs::read_to_string(&first.clean_table).unwrap();

        let second = write_outputs(&table, &stats, &out_dir).unwrap();
        let second_clean = std::fs::read_to_string(&second.clean_table).unwrap();

        assert_eq!(first_clean, second_clean);
    }
}
