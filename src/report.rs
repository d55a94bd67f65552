//! Human-readable ingestion report.
//!
//! Summarizes what the batch loaded and what the key assignment produced:
//! file counts, PSM/spectrum/run totals, the per-window breakdown, and the
//! chimericity rate.

use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;

use crate::aggregate::SummaryStats;
use crate::loader::FileFailure;

/// End-of-run report for the ingestion stage.
#[derive(Debug)]
pub struct IngestReport {
    /// Summary statistics over the consolidated table.
    pub stats: SummaryStats,
    /// Number of files loaded.
    pub files_loaded: usize,
    /// Files dropped from the batch with reasons.
    pub failures: Vec<FileFailure>,
    /// Wall-clock loading time in seconds.
    pub elapsed_seconds: f64,
}

impl IngestReport {
    /// Fraction of spectra carrying two or more identifications.
    pub fn chimeric_fraction(&self) -> f64 {
        if self.stats.n_spectra == 0 {
            return 0.0;
        }
        self.stats.n_chimeric_spectra as f64 / self.stats.n_spectra as f64
    }

    /// Format the report with colors (requires console feature).
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            let mut output = String::new();
            output.push_str(&format!("{}\n", style("PSM Ingestion Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("====================").cyan()));
            output.push_str(&format!(
                "{}: {} loaded, {} dropped ({:.1}s)\n",
                style("Files").bold(),
                style(self.files_loaded).green(),
                style(self.failures.len()).red(),
                self.elapsed_seconds
            ));
            output.push_str(&format!(
                "{}: {} PSMs, {} spectra, {} runs\n",
                style("Totals").bold(),
                self.stats.n_psm,
                self.stats.n_spectra,
                self.stats.n_runs
            ));
            output.push_str(&format!(
                "{}: {} spectra ({:.1}%), {:.2} PSM/spectrum\n",
                style("Chimeric").bold(),
                self.stats.n_chimeric_spectra,
                100.0 * self.chimeric_fraction(),
                self.stats.avg_psm_per_spectrum
            ));

            if !self.stats.per_window.is_empty() {
                output.push_str(&format!("{}\n", style("By window size:").bold()));
                for window in &self.stats.per_window {
                    output.push_str(&format!(
                        "  {:>6.1} m/z: {} PSMs, {} spectra, {:.1}% chimeric\n",
                        window.window_mz,
                        window.psm_count,
                        window.unique_spectra,
                        100.0 * window.chimeric_fraction
                    ));
                }
            }

            for failure in &self.failures {
                output.push_str(&format!(
                    "  {} {}: {}\n",
                    style("dropped").red(),
                    failure.path.display(),
                    failure.reason
                ));
            }

            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PSM Ingestion Report")?;
        writeln!(f, "====================")?;
        writeln!(
            f,
            "Files: {} loaded, {} dropped ({:.1}s)",
            self.files_loaded,
            self.failures.len(),
            self.elapsed_seconds
        )?;
        writeln!(
            f,
            "Totals: {} PSMs, {} spectra, {} runs",
            self.stats.n_psm, self.stats.n_spectra, self.stats.n_runs
        )?;
        writeln!(
            f,
            "Chimeric: {} spectra ({:.1}%), {:.2} PSM/spectrum",
            self.stats.n_chimeric_spectra,
            100.0 * self.chimeric_fraction(),
            self.stats.avg_psm_per_spectrum
        )?;

        if !self.stats.per_window.is_empty() {
            writeln!(f, "By window size:")?;
            for window in &self.stats.per_window {
                writeln!(
                    f,
                    "  {:>6.1} m/z: {} PSMs, {} spectra, {:.1}% chimeric",
                    window.window_mz,
                    window.psm_count,
                    window.unique_spectra,
                    100.0 * window.chimeric_fraction
                )?;
            }
        }

        for failure in &self.failures {
            writeln!(f, "  dropped {}: {}", failure.path.display(), failure.reason)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::WindowAggregate;

    fn sample_report() -> IngestReport {
        IngestReport {
            stats: SummaryStats {
                n_psm: 10,
                n_spectra: 8,
                n_runs: 2,
                n_chimeric_spectra: 2,
                avg_psm_per_spectrum: 1.25,
                window_sizes: vec![1.6],
                per_window: vec![WindowAggregate {
                    window_mz: 1.6,
                    psm_count: 10,
                    unique_spectra: 8,
                    chimeric_fraction: 0.4,
                }],
                columns: vec!["Spectrum".into()],
                generated_at: "2025-01-01T00:00:00Z".into(),
            },
            files_loaded: 3,
            failures: vec![],
            elapsed_seconds: 1.5,
        }
    }

    #[test]
    fn test_display_contains_totals() {
        let text = sample_report().to_string();
        assert!(text.contains("3 loaded, 0 dropped"));
        assert!(text.contains("10 PSMs, 8 spectra, 2 runs"));
        assert!(text.contains("1.6 m/z"));
        assert!(text.contains("25.0%"));
    }

    #[test]
    fn test_chimeric_fraction_empty_table() {
        let mut report = sample_report();
        report.stats.n_spectra = 0;
        report.stats.n_chimeric_spectra = 0;
        assert_eq!(report.chimeric_fraction(), 0.0);
    }
}
