//! Kinoprobe: resilient element resolution and API checks for the
//! Kinopoisk regression suite.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Scenario    │    │  Page        │    │  Resolver    │
//! │  catalogue   │───►│  objects     │───►│  (candidate  │───► Driver
//! │  + runner    │    │  (BasePage)  │    │   lists)     │    (Chromium | fake DOM)
//! └──────┬───────┘    └──────────────┘    └──────────────┘
//!        │
//!        └──────────► ApiClient ───► film API
//! ```
//!
//! A selector is a [`Locator`]; an ordered fallback chain is a
//! [`CandidateList`]. The [`Resolver`] tries each candidate under a
//! [`Condition`] for the full per-attempt timeout before moving on, and stops
//! at the first match. Worst-case latency is therefore the number of
//! candidates times the timeout.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_frames))]

mod condition;
mod driver;
mod locator;
mod page_object;
mod resolver;
mod result;
mod wait;

pub mod api;

#[cfg(feature = "browser")]
pub mod chromium;

pub mod fake_dom;

pub mod pages;

pub mod scenario;

pub mod session;

pub use condition::{Condition, Resolved};
pub use driver::{Driver, ElementHandle};
pub use locator::{CandidateList, Locator, Strategy};
pub use page_object::{xpath_literal, BasePage, PageObject, UrlMatcher};
pub use resolver::{AttemptOutcome, Resolution, ResolutionAttempt, Resolver};
pub use result::{KinoError, KinoResult};
pub use session::{BrowserSession, Launcher, SessionConfig, SessionState};
pub use wait::{Polled, Waiter, DEFAULT_POLL_INTERVAL_MS};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::api::{ApiAssertion, ApiClient, ApiConfig, ApiResponse};
    pub use super::fake_dom::{FakeDriver, FakeElement, FakePage};
    pub use super::pages::{ListsPage, MainPage, SearchPage, Section};
    pub use super::scenario::{
        catalogue, Marker, MarkerExpr, Outcome, RunReport, Scenario, SuiteConfig, SuiteRunner,
    };
    pub use super::{
        BasePage, BrowserSession, CandidateList, Condition, Driver, ElementHandle, KinoError,
        KinoResult, Locator, PageObject, Resolution, Resolver, SessionConfig, Waiter,
    };
}
