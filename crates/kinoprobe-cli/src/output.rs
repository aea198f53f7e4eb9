//! Output formatting and progress reporting

use clap::ValueEnum;
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use kinoprobe::scenario::{Outcome, RunReport, ScenarioResult};
use serde::{Deserialize, Serialize};

/// Output format for reports on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Progress reporter for a run, drawn on stderr
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    // Lines go above the bar while one is drawn.
    fn line(&self, text: &str) {
        match self.progress_bar {
            Some(ref pb) if !pb.is_finished() && !pb.is_hidden() => pb.println(text),
            _ => {
                let _ = self.term.write_line(text);
            }
        }
    }

    fn prefixed(&self, symbol: &str, plain: &str, paint: fn(&str) -> String, message: &str) {
        let prefix = if self.use_color {
            paint(symbol)
        } else {
            plain.to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("✓", "PASS", |s| style(s).green().bold().to_string(), message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Failures print even in quiet mode
        self.prefixed("✗", "FAIL", |s| style(s).red().bold().to_string(), message);
    }

    /// Print a skip message
    pub fn skipped(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("⊘", "SKIP", |s| style(s).yellow().bold().to_string(), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("⚠", "WARN", |s| style(s).yellow().bold().to_string(), message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print one scenario outcome
    pub fn scenario(&self, result: &ScenarioResult) {
        let secs = result.duration.as_secs_f64();
        match &result.outcome {
            Outcome::Passed => self.success(&format!("{} {} ({secs:.2}s)", result.id, result.title)),
            Outcome::Failed { message } => {
                self.failure(&format!("{} {} ({secs:.2}s): {message}", result.id, result.title));
            }
            Outcome::Skipped { reason } => {
                self.skipped(&format!("{} {}: {reason}", result.id, result.title));
            }
        }
    }

    /// Print the run summary
    pub fn summary(&self, report: &RunReport) {
        let totals = report.totals;
        if self.quiet && report.success() {
            return;
        }

        let _ = self.term.write_line("");
        if let Some(ref reason) = report.aborted {
            self.failure(&format!("run aborted: {reason}"));
        }

        let total = report.results.len();
        let duration_secs = report.duration().as_secs_f64();
        let status = if report.success() { "PASSED" } else { "FAILED" };

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if report.success() {
                passed_style.apply_to(status)
            } else {
                failed_style.apply_to(status)
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} skipped)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(totals.passed),
                if totals.failed > 0 {
                    failed_style.apply_to(totals.failed).to_string()
                } else {
                    totals.failed.to_string()
                },
                skipped_style.apply_to(totals.skipped)
            ));
        } else {
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({} passed, {} failed, {} skipped)",
                totals.passed, totals.failed, totals.skipped
            ));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use kinoprobe::scenario::Marker;
    use std::time::Duration;

    fn result(outcome: Outcome) -> ScenarioResult {
        ScenarioResult {
            id: "TC-101".into(),
            title: "Search and open a film".into(),
            markers: vec![Marker::Ui, Marker::Smoke],
            outcome,
            duration: Duration::from_millis(1200),
        }
    }

    mod output_format_tests {
        use super::*;

        #[test]
        fn test_default_format() {
            assert_eq!(OutputFormat::default(), OutputFormat::Text);
        }

        #[test]
        fn test_value_names() {
            assert_eq!(OutputFormat::from_str("json", true).unwrap(), OutputFormat::Json);
            assert!(OutputFormat::from_str("tap", true).is_err());
        }
    }

    mod progress_reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = ProgressReporter::new(false, true);
            assert!(!reporter.use_color);
            assert!(reporter.quiet);
            assert!(reporter.progress_bar.is_none());
        }

        #[test]
        fn test_quiet_skips_progress_bar() {
            let mut reporter = ProgressReporter::new(false, true);
            reporter.start_progress(5, "running");
            assert!(reporter.progress_bar.is_none());
        }

        #[test]
        fn test_progress_counts() {
            let mut reporter = ProgressReporter::new(false, false);
            reporter.start_progress(3, "running");
            reporter.increment(1);
            reporter.increment(1);
            let pb = reporter.progress_bar.as_ref().unwrap();
            assert_eq!(pb.position(), 2);
            reporter.finish();
            assert!(pb.is_finished());
        }

        #[test]
        fn test_scenario_lines_for_every_outcome() {
            let reporter = ProgressReporter::new(false, false);
            reporter.scenario(&result(Outcome::Passed));
            reporter.scenario(&result(Outcome::Failed {
                message: "title mismatch".into(),
            }));
            reporter.scenario(&result(Outcome::Skipped {
                reason: "could not open a film page".into(),
            }));
        }
    }
}
