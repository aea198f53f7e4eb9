//! Command execution: run, list and config

use crate::commands::{ConfigArgs, ListArgs, RunArgs, SuiteArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, ProgressReporter};
use kinoprobe::scenario::{catalogue, select, MarkerExpr, RunReport, Scenario, SuiteConfig, SuiteRunner};
use serde::Serialize;
use std::io::Write;
use tracing::debug;

fn parse_filter(markers: Option<&str>) -> CliResult<Option<MarkerExpr>> {
    markers
        .map(|expr| {
            MarkerExpr::parse(expr).map_err(|e| CliError::invalid_argument(format!("-m {expr:?}: {e}")))
        })
        .transpose()
}

/// Suite settings from flags, then `env` for anything not given
pub(crate) fn suite_config<F>(args: &SuiteArgs, env: F) -> CliResult<SuiteConfig>
where
    F: Fn(&str) -> Option<String>,
{
    SuiteConfig::from_lookup(|key| args.lookup(key).or_else(|| env(key)))
        .map_err(|e| CliError::config(e.to_string()))
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn write_list(out: &mut impl Write, scenarios: &[&Scenario]) -> std::io::Result<()> {
    for scenario in scenarios {
        let markers: Vec<String> = scenario.markers.iter().map(ToString::to_string).collect();
        writeln!(
            out,
            "{:<18} {:<3} {:<20} {}",
            scenario.id,
            scenario.kind.to_string(),
            markers.join(","),
            scenario.title
        )?;
    }
    Ok(())
}

/// Error for a report with failures or an abort
pub(crate) fn check_report(report: &RunReport) -> CliResult<()> {
    if let Some(ref reason) = report.aborted {
        return Err(CliError::test_execution(format!("run aborted: {reason}")));
    }
    if report.totals.failed > 0 {
        return Err(CliError::test_execution(format!(
            "{} of {} scenarios failed",
            report.totals.failed,
            report.results.len()
        )));
    }
    Ok(())
}

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let filter = parse_filter(args.markers.as_deref())?;
    let all = catalogue();
    let selected = select(&all, filter.as_ref());
    if selected.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no scenarios match {:?}",
            args.markers.as_deref().unwrap_or_default()
        )));
    }

    if args.list {
        write_list(&mut std::io::stdout().lock(), &selected)?;
        return Ok(());
    }

    let suite = suite_config(&args.suite, process_env)?;
    debug!(base_url = %suite.base_url, scenarios = selected.len(), "suite configured");

    let mut reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    reporter.header("Kinoprobe");
    reporter.start_progress(selected.len() as u64, "running");

    let mut runner = SuiteRunner::new(suite);
    let report = runner.run_with(&selected, |scenario, result| {
        reporter.set_message(scenario.id);
        reporter.scenario(result);
        reporter.increment(1);
    });
    reporter.finish();

    match args.format {
        OutputFormat::Text => reporter.summary(&report),
        OutputFormat::Json => {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
    }

    check_report(&report)
}

/// Execute the list command
pub fn execute_list(args: &ListArgs) -> CliResult<()> {
    let filter = parse_filter(args.markers.as_deref())?;
    let all = catalogue();
    let selected = select(&all, filter.as_ref());
    write_list(&mut std::io::stdout().lock(), &selected)?;
    Ok(())
}

/// Resolved settings as printed by `kinoprobe config`; the key is masked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigView {
    /// Site under test
    pub base_url: String,
    /// Per-attempt element timeout
    pub ui_wait_secs: u64,
    /// Browser implicit wait
    pub implicit_wait_secs: u64,
    /// Headless browser
    pub headless: bool,
    /// Browser user agent
    pub user_agent: String,
    /// Driver binary, if pinned
    pub driver_binary_path: Option<String>,
    /// Browser binary, if pinned
    pub browser_binary_path: Option<String>,
    /// Persistent profile, if any
    pub profile_directory: Option<String>,
    /// Film API base URL
    pub api_base_url: Option<String>,
    /// Masked film API key
    pub api_key: Option<String>,
}

impl From<&SuiteConfig> for ConfigView {
    fn from(config: &SuiteConfig) -> Self {
        let path = |p: &Option<std::path::PathBuf>| p.as_ref().map(|p| p.display().to_string());
        Self {
            base_url: config.base_url.clone(),
            ui_wait_secs: config.ui_wait.as_secs(),
            implicit_wait_secs: config.session.implicit_wait.as_secs(),
            headless: config.session.headless,
            user_agent: config.session.user_agent.clone(),
            driver_binary_path: path(&config.session.driver_binary_path),
            browser_binary_path: path(&config.session.browser_binary_path),
            profile_directory: path(&config.session.profile_directory),
            api_base_url: config.api.as_ref().map(|api| api.base_url.clone()),
            api_key: config.api.as_ref().and_then(|api| api.masked_key()),
        }
    }
}

impl ConfigView {
    fn write_text(&self, out: &mut impl Write) -> std::io::Result<()> {
        let unset = || "(unset)".to_string();
        writeln!(out, "base_url            {}", self.base_url)?;
        writeln!(out, "ui_wait             {}s", self.ui_wait_secs)?;
        writeln!(out, "implicit_wait       {}s", self.implicit_wait_secs)?;
        writeln!(out, "headless            {}", self.headless)?;
        writeln!(out, "user_agent          {}", self.user_agent)?;
        writeln!(
            out,
            "driver_binary_path  {}",
            self.driver_binary_path.clone().unwrap_or_else(unset)
        )?;
        writeln!(
            out,
            "browser_binary_path {}",
            self.browser_binary_path.clone().unwrap_or_else(unset)
        )?;
        writeln!(
            out,
            "profile_directory   {}",
            self.profile_directory.clone().unwrap_or_else(unset)
        )?;
        writeln!(
            out,
            "api_base_url        {}",
            self.api_base_url.clone().unwrap_or_else(unset)
        )?;
        writeln!(out, "api_key             {}", self.api_key.clone().unwrap_or_else(unset))
    }
}

/// Execute the config command
pub fn execute_config(args: &ConfigArgs) -> CliResult<()> {
    let suite = suite_config(&args.suite, process_env)?;
    let view = ConfigView::from(&suite);
    let mut out = std::io::stdout().lock();
    match args.format {
        OutputFormat::Text => view.write_text(&mut out)?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use kinoprobe::scenario::{Outcome, ScenarioResult};
    use kinoprobe::{BrowserSession, Driver, KinoError, KinoResult, SessionConfig};
    use std::collections::HashMap;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn empty_report() -> RunReport {
        let session = BrowserSession::new(
            SessionConfig::default(),
            |_: &SessionConfig| -> KinoResult<Box<dyn Driver>> { Err(KinoError::transport("no browser")) },
        );
        SuiteRunner::with_session(SuiteConfig::default(), session).run(&[])
    }

    mod suite_config_tests {
        use super::*;

        #[test]
        fn test_flags_override_environment() {
            let args = SuiteArgs {
                base_url: Some("https://flag.test/".into()),
                ui_wait: Some(2),
                ..SuiteArgs::default()
            };
            let config = suite_config(
                &args,
                env(&[("BASE_URL", "https://env.test/"), ("UI_WAIT", "9"), ("IMPLICIT_WAIT", "4")]),
            )
            .unwrap();
            assert_eq!(config.base_url, "https://flag.test/");
            assert_eq!(config.ui_wait, Duration::from_secs(2));
            assert_eq!(config.session.implicit_wait, Duration::from_secs(4));
        }

        #[test]
        fn test_api_only_when_base_url_given() {
            let config = suite_config(&SuiteArgs::default(), env(&[("API_KEY", "secret-key")])).unwrap();
            assert!(config.api.is_none());

            let args = SuiteArgs {
                api_base_url: Some("http://127.0.0.1:9".into()),
                ..SuiteArgs::default()
            };
            let config = suite_config(&args, env(&[("API_KEY", "secret-key")])).unwrap();
            let api = config.api.unwrap();
            assert_eq!(api.base_url, "http://127.0.0.1:9");
            assert_eq!(api.api_key.as_deref(), Some("secret-key"));
        }

        #[test]
        fn test_bad_environment_value_is_config_error() {
            let err = suite_config(&SuiteArgs::default(), env(&[("IMPLICIT_WAIT", "later")])).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
            assert!(err.to_string().contains("IMPLICIT_WAIT"));
        }
    }

    mod filter_tests {
        use super::*;

        #[test]
        fn test_no_filter() {
            assert!(parse_filter(None).unwrap().is_none());
        }

        #[test]
        fn test_unknown_marker_is_invalid_argument() {
            let err = parse_filter(Some("api and slow")).unwrap_err();
            assert!(matches!(err, CliError::InvalidArgument { .. }));
        }
    }

    mod list_tests {
        use super::*;

        #[test]
        fn test_list_lines() {
            let all = catalogue();
            let expr = MarkerExpr::parse("ui and regression").unwrap();
            let selected = select(&all, Some(&expr));
            let mut out = Vec::new();
            write_list(&mut out, &selected).unwrap();
            let text = String::from_utf8(out).unwrap();
            let ids: Vec<&str> = text.lines().filter_map(|l| l.split_whitespace().next()).collect();
            assert_eq!(ids, ["TC-103", "TC-105"]);
            assert!(text.contains("ui,regression"));
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_clean_report_passes() {
            assert!(check_report(&empty_report()).is_ok());
        }

        #[test]
        fn test_failures_fail_the_run() {
            let mut report = empty_report();
            report.results.push(ScenarioResult {
                id: "api_top_250".into(),
                title: "Top 250".into(),
                markers: vec![],
                outcome: Outcome::Failed {
                    message: "expected status 200, got 401".into(),
                },
                duration: Duration::ZERO,
            });
            report.totals.failed = 1;
            let err = check_report(&report).unwrap_err();
            assert_eq!(err.to_string(), "Test execution failed: 1 of 1 scenarios failed");
        }

        #[test]
        fn test_abort_fails_the_run() {
            let mut report = empty_report();
            report.aborted = Some("API_KEY is not set".into());
            let err = check_report(&report).unwrap_err();
            assert!(err.to_string().contains("API_KEY is not set"));
        }
    }

    mod config_view_tests {
        use super::*;

        #[test]
        fn test_key_is_masked() {
            let args = SuiteArgs {
                api_base_url: Some("https://api.test".into()),
                api_key: Some("0123456789abcdef".into()),
                ..SuiteArgs::default()
            };
            let config = suite_config(&args, env(&[])).unwrap();
            let view = ConfigView::from(&config);
            assert_eq!(view.api_key.as_deref(), Some("************cdef"));

            let mut out = Vec::new();
            view.write_text(&mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(!text.contains("0123456789abcdef"));
            assert!(text.contains("profile_directory   (unset)"));

            let json = serde_json::to_string(&view).unwrap();
            assert!(!json.contains("0123456789abcdef"));
        }
    }
}
