//! Page Object base contract.
//!
//! [`BasePage`] binds a driver session and a default per-attempt timeout, and
//! exposes the reusable actions every concrete page is built from. Targets
//! are anything convertible into a [`CandidateList`], so a single
//! [`Locator`] and a fallback chain are used the same way.
//!
//! Every action propagates an unresolved target as
//! [`KinoError::ResolutionExhausted`]. [`BasePage::is_visible`] is the one
//! exception: it answers `false` instead.

use crate::condition::{Condition, Resolved};
use crate::driver::{Driver, ElementHandle};
use crate::locator::{CandidateList, Locator};
use crate::resolver::{Resolution, Resolver};
use crate::result::{KinoError, KinoResult};
use std::time::Duration;
use tracing::{debug, info};

/// A page or component with a recognisable URL.
///
/// # Example
///
/// ```ignore
/// impl<D: Driver + ?Sized> PageObject for SearchPage<'_, D> {
///     fn url_pattern(&self) -> &str {
///         "/s/"
///     }
/// }
/// ```
pub trait PageObject {
    /// URL path pattern for this page (e.g. "/s/", "/film/:id/")
    fn url_pattern(&self) -> &str;

    /// Page name for logging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Driver session plus default timeout, with the base actions
#[derive(Debug)]
pub struct BasePage<'d, D: Driver + ?Sized> {
    driver: &'d mut D,
    base_url: String,
    default_timeout: Duration,
    resolver: Resolver,
}

impl<'d, D: Driver + ?Sized> BasePage<'d, D> {
    /// Bind a session, the site root and the default per-attempt timeout
    pub fn new(driver: &'d mut D, base_url: impl Into<String>, default_timeout: Duration) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            default_timeout,
            resolver: Resolver::new(),
        }
    }

    /// Replace the resolver (e.g. for a faster polling interval)
    #[must_use]
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Underlying driver
    pub fn driver(&mut self) -> &mut D {
        self.driver
    }

    /// Site root
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-attempt timeout used when an action is given `None`
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Absolute URL for a site-relative path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Load a URL
    pub fn open(&mut self, url: &str) -> KinoResult<()> {
        info!(url, "open");
        self.driver.navigate(url)
    }

    /// Load a site-relative path and wait for `<body>`
    pub fn open_path(&mut self, path: &str, timeout: Option<Duration>) -> KinoResult<()> {
        let url = self.url_for(path);
        self.open(&url)?;
        self.wait_loaded(timeout)
    }

    /// Wait for `<body>` to be present
    pub fn wait_loaded(&mut self, timeout: Option<Duration>) -> KinoResult<()> {
        self.find_element(Locator::tag("body"), timeout).map(|_| ())
    }

    /// Run the resolution engine and hand back the raw outcome.
    ///
    /// Use this when exhaustion should degrade rather than fail.
    pub fn resolve(
        &mut self,
        target: impl Into<CandidateList>,
        condition: &Condition,
        timeout: Option<Duration>,
    ) -> KinoResult<Resolution> {
        let candidates = target.into();
        let timeout = timeout.unwrap_or(self.default_timeout);
        self.resolver
            .resolve(&mut *self.driver, &candidates, condition, timeout)
    }

    fn resolve_element(
        &mut self,
        target: impl Into<CandidateList>,
        condition: &Condition,
        timeout: Option<Duration>,
    ) -> KinoResult<ElementHandle> {
        self.resolve(target, condition, timeout)?.into_element()
    }

    /// First present element
    pub fn find_element(
        &mut self,
        target: impl Into<CandidateList>,
        timeout: Option<Duration>,
    ) -> KinoResult<ElementHandle> {
        self.resolve_element(target, &Condition::Present, timeout)
    }

    /// First displayed and enabled element
    pub fn find_clickable(
        &mut self,
        target: impl Into<CandidateList>,
        timeout: Option<Duration>,
    ) -> KinoResult<ElementHandle> {
        self.resolve_element(target, &Condition::Clickable, timeout)
    }

    /// Every element of the first candidate that matches anything
    pub fn wait_for_all(
        &mut self,
        target: impl Into<CandidateList>,
        timeout: Option<Duration>,
    ) -> KinoResult<Vec<ElementHandle>> {
        let (resolved, _) = self
            .resolve(target, &Condition::AllPresent, timeout)?
            .into_result()?;
        Ok(resolved.into_elements())
    }

    /// Click the first clickable element
    pub fn click(&mut self, target: impl Into<CandidateList>) -> KinoResult<ElementHandle> {
        let element = self.find_clickable(target, None)?;
        self.click_element(&element)?;
        Ok(element)
    }

    /// Click an element that has already been resolved
    pub fn click_element(&mut self, element: &ElementHandle) -> KinoResult<()> {
        debug!(element = %element.id, tag = %element.tag_name, "click");
        self.driver.click(element)
    }

    /// Clear the field, then type `text`.
    ///
    /// The field must end up holding exactly `text`; anything else (an
    /// append, a partial overwrite) is an assertion failure.
    pub fn type_text(&mut self, target: impl Into<CandidateList>, text: &str) -> KinoResult<ElementHandle> {
        let element = self.find_clickable(target, None)?;
        self.type_into(&element, text)?;
        Ok(element)
    }

    /// Clear-then-type into an element that has already been resolved
    pub fn type_into(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()> {
        self.driver.clear(element)?;
        self.driver.send_keys(element, text)?;
        let actual = self.driver.value_of(element)?;
        if actual != text {
            return Err(KinoError::assertion(format!(
                "<{}> holds {actual:?} after typing {text:?}",
                element.tag_name
            )));
        }
        Ok(())
    }

    /// Text of the first present element
    pub fn read_text(&mut self, target: impl Into<CandidateList>) -> KinoResult<String> {
        Ok(self.find_element(target, None)?.text)
    }

    /// Whether any candidate becomes visible within the timeout.
    ///
    /// Exhaustion maps to `Ok(false)`; only precondition and transport
    /// errors are returned as `Err`.
    pub fn is_visible(
        &mut self,
        target: impl Into<CandidateList>,
        timeout: Option<Duration>,
    ) -> KinoResult<bool> {
        Ok(self.resolve(target, &Condition::Visible, timeout)?.is_success())
    }

    /// Choose a `<select>` option by its `value`
    pub fn select_dropdown_by_value(
        &mut self,
        target: impl Into<CandidateList>,
        value: &str,
    ) -> KinoResult<()> {
        let element = self.find_element(target, None)?;
        self.driver.select_by_value(&element, value)
    }

    /// Choose a `<select>` option by its visible text
    pub fn select_dropdown_by_visible_text(
        &mut self,
        target: impl Into<CandidateList>,
        text: &str,
    ) -> KinoResult<()> {
        let element = self.find_element(target, None)?;
        self.driver.select_by_visible_text(&element, text)
    }

    /// Every element matching `locator` right now, without waiting
    pub fn find_all(&mut self, locator: &Locator) -> KinoResult<Vec<ElementHandle>> {
        self.driver.find_all(locator)
    }

    /// Press Enter in an element
    pub fn press_enter(&mut self, element: &ElementHandle) -> KinoResult<()> {
        self.driver.press_enter(element)
    }

    /// Wait until the URL contains `fragment`, returning the URL
    pub fn wait_for_url(&mut self, fragment: &str, timeout: Option<Duration>) -> KinoResult<String> {
        let condition = Condition::UrlContains(fragment.to_string());
        let (resolved, _) = self
            .resolve(Locator::tag("html"), &condition, timeout)?
            .into_result()?;
        match resolved {
            Resolved::Url(url) => Ok(url),
            _ => Err(KinoError::precondition("url condition resolved to an element")),
        }
    }

    /// Current page title
    pub fn title(&mut self) -> KinoResult<String> {
        self.driver.title()
    }

    /// Current URL
    pub fn current_url(&mut self) -> KinoResult<String> {
        self.driver.current_url()
    }

    /// Whether the current URL's path matches `pattern`
    pub fn is_at(&mut self, pattern: &str) -> KinoResult<bool> {
        let url = self.driver.current_url()?;
        Ok(UrlMatcher::new(pattern).matches_url(&url))
    }
}

/// Quote a string as an XPath literal
#[must_use]
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// URL path matcher for page objects
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
    Rest,
}

impl UrlMatcher {
    /// Create a matcher.
    ///
    /// Patterns support literal segments (`/s/`), wildcards (`/lists/*/top250/`),
    /// named parameters (`/film/:id/`) and a trailing `**` for any remainder.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "**" {
                    UrlSegment::Rest
                } else if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match a path; every segment must be consumed
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.extract_params(path).is_some()
    }

    /// Match the path portion of an absolute or relative URL
    #[must_use]
    pub fn matches_url(&self, url: &str) -> bool {
        self.matches(path_of(url))
    }

    /// Named parameters from a matching path
    #[must_use]
    pub fn extract_params(&self, path: &str) -> Option<Vec<(String, String)>> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let mut params = Vec::new();

        for segment in &self.segments {
            let part = match segment {
                UrlSegment::Rest => return Some(params),
                _ => parts.next()?,
            };
            match segment {
                UrlSegment::Literal(lit) if lit.as_str() != part => return None,
                UrlSegment::Parameter(name) => params.push((name.clone(), part.to_string())),
                _ => {}
            }
        }
        parts.next().is_none().then_some(params)
    }
}

fn path_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = if url.contains("://") {
        without_scheme.find('/').map_or("/", |i| &without_scheme[i..])
    } else {
        without_scheme
    };
    path.split(['?', '#']).next().unwrap_or(path)
}
