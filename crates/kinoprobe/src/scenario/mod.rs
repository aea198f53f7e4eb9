//! Scenario catalogue, marker selection and the suite runner.

mod catalogue;
mod marker;
mod runner;

pub use catalogue::{catalogue, ApiFlow, Scenario, ScenarioKind, UiFlow};
pub use marker::{Marker, MarkerExpr};
pub use runner::{
    select, Outcome, RunReport, ScenarioResult, SuiteConfig, SuiteRunner, Totals,
    DEFAULT_BASE_URL, DEFAULT_UI_WAIT_SECS,
};
