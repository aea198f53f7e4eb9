//! Sequential suite runner and run report.

use super::catalogue::{Flow, Scenario};
use super::marker::{Marker, MarkerExpr};
use crate::api::{ApiClient, ApiConfig};
use crate::result::{KinoError, KinoResult};
use crate::session::{parse_secs, BrowserSession, SessionConfig};
use crate::wait::DEFAULT_POLL_INTERVAL_MS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Site root when `BASE_URL` is unset
pub const DEFAULT_BASE_URL: &str = "https://www.kinopoisk.ru/";

/// Per-attempt UI wait when `UI_WAIT` is unset, in seconds
pub const DEFAULT_UI_WAIT_SECS: u64 = 15;

/// Everything a run needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Site root for browser scenarios
    pub base_url: String,
    /// Per-attempt element wait for browser scenarios
    pub ui_wait: Duration,
    /// Polling interval while waiting
    pub poll_interval: Duration,
    /// API endpoint; `None` when `API_BASE_URL` is unset
    pub api: Option<ApiConfig>,
    /// Browser session settings
    pub session: SessionConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ui_wait: Duration::from_secs(DEFAULT_UI_WAIT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            api: None,
            session: SessionConfig::default(),
        }
    }
}

impl SuiteConfig {
    /// Read from the process environment
    pub fn from_env() -> KinoResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> KinoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self {
            session: SessionConfig::from_lookup(&lookup)?,
            ..Self::default()
        };
        if let Some(url) = get("BASE_URL") {
            config.base_url = url;
        }
        if let Some(raw) = get("UI_WAIT") {
            config.ui_wait = parse_secs("UI_WAIT", &raw)?;
        }
        if get("API_BASE_URL").is_some() {
            config.api = Some(ApiConfig::from_lookup(&lookup)?);
        }
        Ok(config)
    }

    fn api_config(&self) -> KinoResult<&ApiConfig> {
        self.api
            .as_ref()
            .ok_or_else(|| KinoError::precondition("API_BASE_URL is not set"))
    }
}

/// How one scenario ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// Every check held
    Passed,
    /// A check or the transport failed
    Failed {
        /// Error text
        message: String,
    },
    /// The scenario could not reach the state it tests
    Skipped {
        /// Why
        reason: String,
    },
}

impl Outcome {
    /// Map a scenario's return value
    #[must_use]
    pub fn from_result(result: &KinoResult<()>) -> Self {
        match result {
            Ok(()) => Self::Passed,
            Err(KinoError::Skipped { reason }) => Self::Skipped {
                reason: reason.clone(),
            },
            Err(err) => Self::Failed {
                message: err.to_string(),
            },
        }
    }

    /// Whether this counts as a failure
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario id
    pub id: String,
    /// Scenario title
    pub title: String,
    /// Scenario markers
    pub markers: Vec<Marker>,
    /// How it ended
    pub outcome: Outcome,
    /// Wall time
    pub duration: Duration,
}

/// Counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Passed scenarios
    pub passed: usize,
    /// Failed scenarios
    pub failed: usize,
    /// Skipped scenarios
    pub skipped: usize,
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier
    pub run_id: Uuid,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// When the run ended
    pub finished_at: DateTime<Utc>,
    /// Per-scenario results in run order
    pub results: Vec<ScenarioResult>,
    /// Counts by outcome
    pub totals: Totals,
    /// Set when a configuration error stopped the run early
    pub aborted: Option<String>,
}

impl RunReport {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            results: Vec::new(),
            totals: Totals::default(),
            aborted: None,
        }
    }

    fn record(&mut self, result: ScenarioResult) {
        match result.outcome {
            Outcome::Passed => self.totals.passed += 1,
            Outcome::Failed { .. } => self.totals.failed += 1,
            Outcome::Skipped { .. } => self.totals.skipped += 1,
        }
        self.results.push(result);
    }

    /// No failures and not aborted
    #[must_use]
    pub const fn success(&self) -> bool {
        self.totals.failed == 0 && self.aborted.is_none()
    }

    /// Failed results
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| r.outcome.is_failure()).collect()
    }

    /// Wall time of the whole run
    #[must_use]
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Scenarios matching an optional `-m` expression, in catalogue order
#[must_use]
pub fn select<'a>(scenarios: &'a [Scenario], filter: Option<&MarkerExpr>) -> Vec<&'a Scenario> {
    scenarios
        .iter()
        .filter(|s| filter.map_or(true, |expr| expr.matches(s.markers)))
        .collect()
}

/// Runs scenarios one after another.
///
/// API scenarios share one client; browser scenarios share one session,
/// launched on first use and torn down when the run ends.
#[derive(Debug)]
pub struct SuiteRunner {
    config: SuiteConfig,
    session: BrowserSession,
    api: Option<ApiClient>,
}

impl SuiteRunner {
    /// Runner with a Chromium session
    #[must_use]
    pub fn new(config: SuiteConfig) -> Self {
        let session = BrowserSession::chromium(config.session.clone());
        Self::with_session(config, session)
    }

    /// Runner with a caller-supplied session
    #[must_use]
    pub fn with_session(config: SuiteConfig, session: BrowserSession) -> Self {
        Self {
            config,
            session,
            api: None,
        }
    }

    /// Settings
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run `scenarios` in order.
    ///
    /// A configuration error stops the run; the report records it in
    /// [`RunReport::aborted`] along with the results gathered so far.
    pub fn run(&mut self, scenarios: &[&Scenario]) -> RunReport {
        self.run_with(scenarios, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `on_result` after each scenario
    pub fn run_with<F>(&mut self, scenarios: &[&Scenario], mut on_result: F) -> RunReport
    where
        F: FnMut(&Scenario, &ScenarioResult),
    {
        let mut report = RunReport::new();
        info!(run_id = %report.run_id, scenarios = scenarios.len(), "run started");

        for scenario in scenarios {
            let started = Instant::now();
            let result = self.execute(scenario);
            let outcome = Outcome::from_result(&result);
            match &outcome {
                Outcome::Passed => info!(id = scenario.id, "passed"),
                Outcome::Failed { message } => error!(id = scenario.id, error = %message, "failed"),
                Outcome::Skipped { reason } => warn!(id = scenario.id, reason, "skipped"),
            }

            let scenario_result = ScenarioResult {
                id: scenario.id.to_string(),
                title: scenario.title.to_string(),
                markers: scenario.markers.to_vec(),
                outcome,
                duration: started.elapsed(),
            };
            on_result(scenario, &scenario_result);
            report.record(scenario_result);

            if let Err(err) = &result {
                if err.is_run_fatal() {
                    error!(error = %err, "run aborted");
                    report.aborted = Some(err.to_string());
                    break;
                }
            }
        }

        if let Err(err) = self.session.teardown() {
            warn!(error = %err, "browser teardown failed");
        }
        report.finished_at = Utc::now();
        info!(
            passed = report.totals.passed,
            failed = report.totals.failed,
            skipped = report.totals.skipped,
            "run finished"
        );
        report
    }

    fn execute(&mut self, scenario: &Scenario) -> KinoResult<()> {
        info!(id = scenario.id, title = scenario.title, "running");
        match scenario.flow {
            Flow::Api(flow) => flow(self.api_client()?),
            Flow::Ui(flow) => {
                let config = &self.config;
                let driver = self.session.driver()?;
                flow(driver, config)
            }
        }
    }

    fn api_client(&mut self) -> KinoResult<&ApiClient> {
        if self.api.is_none() {
            let client = ApiClient::new(self.config.api_config()?.clone())
                .map_err(|e| KinoError::precondition(format!("API client setup failed: {e}")))?;
            self.api = Some(client);
        }
        self.api
            .as_ref()
            .ok_or_else(|| KinoError::precondition("API client unavailable"))
    }
}
