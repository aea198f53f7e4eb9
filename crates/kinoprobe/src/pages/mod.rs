//! Kinopoisk page objects.
//!
//! Each page owns a [`BasePage`](crate::BasePage) and the
//! candidate lists for its targets. Lists are ordered most stable first.

mod lists_page;
mod main_page;
mod search_page;

pub use lists_page::{ListsPage, Section};
pub use main_page::MainPage;
pub use search_page::SearchPage;

/// Film link selector shared by every listing page
pub const FILM_LINK: &str = "a[href*='/film/']";

/// Grouped selector for any search results container
pub const RESULTS_CONTAINER: &str =
    ".search_results, .search-results, [data-tid*='search'], .styles_root__tiG8t";
