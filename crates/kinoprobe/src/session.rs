//! Browser session: configuration and the run-scoped lifecycle.
//!
//! One [`BrowserSession`] is shared by every UI scenario in a run. It is
//! launched on first use and torn down once at the end. Cookies and profile
//! state carry over from one scenario to the next; scenarios that depend on
//! a clean browser must reset it themselves.

use crate::driver::Driver;
use crate::result::{KinoError, KinoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

/// Seconds to wait for an element when nothing is configured
pub const DEFAULT_IMPLICIT_WAIT_SECS: u64 = 10;

/// Seconds to wait for a page load
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

/// Driver session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Driver binary; must exist when set
    pub driver_binary_path: Option<PathBuf>,
    /// Browser binary; must exist when set (auto-detected otherwise)
    pub browser_binary_path: Option<PathBuf>,
    /// Persistent profile directory
    pub profile_directory: Option<PathBuf>,
    /// User agent override
    pub user_agent: String,
    /// Window size in pixels
    pub window_size: (u32, u32),
    /// Hide `navigator.webdriver` and the automation blink feature
    pub suppress_automation_fingerprint: bool,
    /// How long a stale element lookup is retried before it times out
    pub implicit_wait: Duration,
    /// Page load timeout
    pub page_load_timeout: Duration,
    /// Run without a window
    pub headless: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            driver_binary_path: None,
            browser_binary_path: None,
            profile_directory: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_size: (1920, 1080),
            suppress_automation_fingerprint: true,
            implicit_wait: Duration::from_secs(DEFAULT_IMPLICIT_WAIT_SECS),
            page_load_timeout: Duration::from_secs(DEFAULT_PAGE_LOAD_TIMEOUT_SECS),
            headless: false,
        }
    }
}

impl SessionConfig {
    /// Read from the process environment
    pub fn from_env() -> KinoResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> KinoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.driver_binary_path = get("CHROMEDRIVER_PATH").map(PathBuf::from);
        config.browser_binary_path = get("CHROME_BINARY_PATH").map(PathBuf::from);
        config.profile_directory = get("CHROME_PROFILE_DIR").map(PathBuf::from);
        if let Some(ua) = get("KINOPROBE_USER_AGENT") {
            config.user_agent = ua;
        }
        if let Some(raw) = get("IMPLICIT_WAIT") {
            config.implicit_wait = parse_secs("IMPLICIT_WAIT", &raw)?;
        }
        if let Some(raw) = get("KINOPROBE_HEADLESS") {
            config.headless = parse_flag("KINOPROBE_HEADLESS", &raw)?;
        }
        Ok(config)
    }

    /// Check every configured binary path exists
    pub fn validate(&self) -> KinoResult<()> {
        let binaries = [
            ("driver binary", &self.driver_binary_path),
            ("browser binary", &self.browser_binary_path),
        ];
        for (what, path) in binaries {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(KinoError::precondition(format!(
                        "{what} not found: {}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Browser command-line switches
    #[must_use]
    pub fn browser_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--user-agent={}", self.user_agent),
            "--start-maximized".to_string(),
        ];
        if self.suppress_automation_fingerprint {
            args.push("--disable-blink-features=AutomationControlled".to_string());
        }
        args
    }
}

/// Seconds as a [`Duration`]; anything else is a configuration error
pub fn parse_secs(key: &str, raw: &str) -> KinoResult<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| KinoError::precondition(format!("{key} must be whole seconds, got {raw:?}")))
}

fn parse_flag(key: &str, raw: &str) -> KinoResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(KinoError::precondition(format!("{key} must be a boolean, got {raw:?}"))),
    }
}

/// Starts a driver for a session
pub trait Launcher {
    /// Start a driver
    fn launch(&mut self, config: &SessionConfig) -> KinoResult<Box<dyn Driver>>;

    /// Name for logging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Launcher for F
where
    F: FnMut(&SessionConfig) -> KinoResult<Box<dyn Driver>>,
{
    fn launch(&mut self, config: &SessionConfig) -> KinoResult<Box<dyn Driver>> {
        self(config)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Launches Chromium over CDP
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

impl Launcher for ChromiumLauncher {
    #[cfg(feature = "browser")]
    fn launch(&mut self, config: &SessionConfig) -> KinoResult<Box<dyn Driver>> {
        Ok(Box::new(crate::chromium::ChromiumDriver::launch(config)?))
    }

    #[cfg(not(feature = "browser"))]
    fn launch(&mut self, _config: &SessionConfig) -> KinoResult<Box<dyn Driver>> {
        Err(KinoError::precondition("browser support not compiled in"))
    }

    fn name(&self) -> &str {
        "chromium"
    }
}

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Not launched yet
    Idle,
    /// Launched and usable
    Active,
    /// Torn down; cannot be relaunched
    Closed,
    /// Launch failed
    Failed,
}

/// Lazily launched, explicitly torn down browser session
pub struct BrowserSession {
    config: SessionConfig,
    launcher: Box<dyn Launcher>,
    driver: Option<Box<dyn Driver>>,
    state: SessionState,
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserSession")
            .field("launcher", &self.launcher.name())
            .field("state", &self.state)
            .finish()
    }
}

impl BrowserSession {
    /// Session with a custom launcher
    pub fn new(config: SessionConfig, launcher: impl Launcher + 'static) -> Self {
        Self {
            config,
            launcher: Box::new(launcher),
            driver: None,
            state: SessionState::Idle,
        }
    }

    /// Session backed by Chromium
    #[must_use]
    pub fn chromium(config: SessionConfig) -> Self {
        Self::new(config, ChromiumLauncher)
    }

    /// Settings
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The driver, launching it on first call.
    ///
    /// # Errors
    ///
    /// [`KinoError::PreconditionViolation`] if the configuration is invalid,
    /// the launch fails, or the session was already torn down.
    pub fn driver(&mut self) -> KinoResult<&mut dyn Driver> {
        match self.state {
            SessionState::Active => {}
            SessionState::Idle => self.launch()?,
            SessionState::Closed => {
                return Err(KinoError::precondition("browser session already torn down"))
            }
            SessionState::Failed => {
                return Err(KinoError::precondition("browser session failed to launch"))
            }
        }

        match self.driver.as_mut() {
            Some(driver) => Ok(&mut **driver),
            None => Err(KinoError::precondition("browser session has no driver")),
        }
    }

    fn launch(&mut self) -> KinoResult<()> {
        info!(launcher = self.launcher.name(), headless = self.config.headless, "launching browser");
        let launched = self
            .config
            .validate()
            .and_then(|()| self.launcher.launch(&self.config));

        match launched {
            Ok(driver) => {
                self.driver = Some(driver);
                self.state = SessionState::Active;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Failed;
                Err(match err {
                    KinoError::PreconditionViolation { .. } => err,
                    other => KinoError::precondition(format!("browser launch failed: {other}")),
                })
            }
        }
    }

    /// Quit the driver if it was launched. Idempotent.
    pub fn teardown(&mut self) -> KinoResult<()> {
        let driver = self.driver.take();
        if self.state != SessionState::Failed {
            self.state = SessionState::Closed;
        }
        if let Some(mut driver) = driver {
            info!("closing browser");
            driver.quit()?;
        }
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!(error = %err, "browser teardown failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::ElementHandle;
    use crate::fake_dom::{FakeDriver, FakePage};
    use crate::locator::Locator;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    /// Counts quits, otherwise a `FakeDriver`
    struct Tracked {
        inner: FakeDriver,
        quits: Arc<AtomicUsize>,
    }

    impl Driver for Tracked {
        fn navigate(&mut self, url: &str) -> KinoResult<()> {
            self.inner.navigate(url)
        }
        fn current_url(&mut self) -> KinoResult<String> {
            self.inner.current_url()
        }
        fn title(&mut self) -> KinoResult<String> {
            self.inner.title()
        }
        fn find_all(&mut self, locator: &Locator) -> KinoResult<Vec<ElementHandle>> {
            self.inner.find_all(locator)
        }
        fn click(&mut self, element: &ElementHandle) -> KinoResult<()> {
            self.inner.click(element)
        }
        fn clear(&mut self, element: &ElementHandle) -> KinoResult<()> {
            self.inner.clear(element)
        }
        fn send_keys(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()> {
            self.inner.send_keys(element, text)
        }
        fn press_enter(&mut self, element: &ElementHandle) -> KinoResult<()> {
            self.inner.press_enter(element)
        }
        fn value_of(&mut self, element: &ElementHandle) -> KinoResult<String> {
            self.inner.value_of(element)
        }
        fn select_by_value(&mut self, element: &ElementHandle, value: &str) -> KinoResult<()> {
            self.inner.select_by_value(element, value)
        }
        fn select_by_visible_text(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()> {
            self.inner.select_by_visible_text(element, text)
        }
        fn quit(&mut self) -> KinoResult<()> {
            self.quits.fetch_add(1, Ordering::SeqCst);
            self.inner.quit()
        }
    }

    fn tracked_session(launches: Arc<AtomicUsize>, quits: Arc<AtomicUsize>) -> BrowserSession {
        BrowserSession::new(SessionConfig::default(), move |_: &SessionConfig| -> KinoResult<Box<dyn Driver>> {
            launches.fetch_add(1, Ordering::SeqCst);
            let inner = FakeDriver::new().with_page(FakePage::new("https://kino.test/", "Кинопоиск"));
            Ok(Box::new(Tracked {
                inner,
                quits: quits.clone(),
            }))
        })
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = SessionConfig::from_lookup(|_| None).unwrap();
            assert_eq!(config.implicit_wait, Duration::from_secs(10));
            assert_eq!(config.page_load_timeout, Duration::from_secs(30));
            assert_eq!(config.window_size, (1920, 1080));
            assert!(config.suppress_automation_fingerprint);
            assert!(config.browser_args().iter().any(|a| a.contains("AutomationControlled")));
        }

        #[test]
        fn test_reads_lookup() {
            let config = SessionConfig::from_lookup(lookup(&[
                ("IMPLICIT_WAIT", "3"),
                ("CHROME_PROFILE_DIR", "/tmp/profile"),
                ("KINOPROBE_USER_AGENT", "kinoprobe/1.0"),
                ("KINOPROBE_HEADLESS", "yes"),
                ("CHROMEDRIVER_PATH", "  "),
            ]))
            .unwrap();
            assert_eq!(config.implicit_wait, Duration::from_secs(3));
            assert_eq!(config.profile_directory, Some(PathBuf::from("/tmp/profile")));
            assert_eq!(config.user_agent, "kinoprobe/1.0");
            assert!(config.headless);
            assert!(config.driver_binary_path.is_none());
        }

        #[test]
        fn test_rejects_bad_values() {
            let err = SessionConfig::from_lookup(lookup(&[("IMPLICIT_WAIT", "soon")])).unwrap_err();
            assert!(err.is_run_fatal());
            assert!(SessionConfig::from_lookup(lookup(&[("KINOPROBE_HEADLESS", "maybe")])).is_err());
        }

        #[test]
        fn test_validate_binary_paths() {
            let dir = tempfile::tempdir().unwrap();
            let binary = dir.path().join("chromedriver");
            std::fs::write(&binary, b"#!/bin/sh\n").unwrap();

            let mut config = SessionConfig {
                driver_binary_path: Some(binary),
                ..SessionConfig::default()
            };
            assert!(config.validate().is_ok());

            config.browser_binary_path = Some(dir.path().join("chrome"));
            let err = config.validate().unwrap_err();
            assert!(matches!(err, KinoError::PreconditionViolation { .. }));
            assert!(err.to_string().contains("browser binary not found"));
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_launches_lazily_once() {
            let launches = Arc::new(AtomicUsize::new(0));
            let quits = Arc::new(AtomicUsize::new(0));
            let mut session = tracked_session(launches.clone(), quits.clone());
            assert_eq!(session.state(), SessionState::Idle);
            assert_eq!(launches.load(Ordering::SeqCst), 0);

            session.driver().unwrap().navigate("https://kino.test/").unwrap();
            let title = session.driver().unwrap().title().unwrap();
            assert_eq!(title, "Кинопоиск");
            assert_eq!(launches.load(Ordering::SeqCst), 1);
            assert_eq!(session.state(), SessionState::Active);
        }

        #[test]
        fn test_teardown_quits_once() {
            let launches = Arc::new(AtomicUsize::new(0));
            let quits = Arc::new(AtomicUsize::new(0));
            let mut session = tracked_session(launches, quits.clone());
            session.driver().unwrap();
            session.teardown().unwrap();
            session.teardown().unwrap();
            drop(session);
            assert_eq!(quits.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn test_unused_session_never_launches() {
            let launches = Arc::new(AtomicUsize::new(0));
            let quits = Arc::new(AtomicUsize::new(0));
            let mut session = tracked_session(launches.clone(), quits.clone());
            session.teardown().unwrap();
            assert_eq!(launches.load(Ordering::SeqCst), 0);
            assert_eq!(quits.load(Ordering::SeqCst), 0);
            let err = session.driver().err().unwrap();
            assert!(err.is_run_fatal());
        }

        #[test]
        fn test_launch_failure_is_precondition() {
            let mut session = BrowserSession::new(SessionConfig::default(), |_: &SessionConfig| -> KinoResult<Box<dyn Driver>> {
                Err(KinoError::transport("cannot connect to devtools"))
            });
            let err = session.driver().err().unwrap();
            assert!(err.is_run_fatal());
            assert!(err.to_string().contains("cannot connect to devtools"));
            assert_eq!(session.state(), SessionState::Failed);
            assert!(session.driver().is_err());
        }

        #[test]
        fn test_missing_binary_fails_before_launch() {
            let launches = Arc::new(AtomicUsize::new(0));
            let counter = launches.clone();
            let config = SessionConfig {
                driver_binary_path: Some(PathBuf::from("/nonexistent/chromedriver")),
                ..SessionConfig::default()
            };
            let mut session = BrowserSession::new(config, move |_: &SessionConfig| -> KinoResult<Box<dyn Driver>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeDriver::new()))
            });
            assert!(session.driver().err().unwrap().is_run_fatal());
            assert_eq!(launches.load(Ordering::SeqCst), 0);
        }

        #[cfg(not(feature = "browser"))]
        #[test]
        fn test_chromium_without_feature() {
            let mut session = BrowserSession::chromium(SessionConfig::default());
            let err = session.driver().err().unwrap();
            assert!(err.to_string().contains("browser support not compiled in"));
        }
    }
}
