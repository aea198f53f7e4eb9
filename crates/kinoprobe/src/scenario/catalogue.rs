//! The regression suite: five API checks and five browser flows.

use super::marker::Marker;
use super::runner::SuiteConfig;
use crate::api::{ApiAssertion, ApiClient, FilmFilter, TopList};
use crate::driver::Driver;
use crate::page_object::BasePage;
use crate::pages::{ListsPage, MainPage, SearchPage, Section};
use crate::resolver::{Resolution, Resolver};
use crate::result::{KinoError, KinoResult};
use crate::wait::Waiter;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

const SITE_TITLE: &str = "Кинопоиск";
const KEYWORD: &str = "миньоны";
const KEYWORD_LATENCY_LIMIT: Duration = Duration::from_millis(1100);
const KNOWN_FILM_ID: u64 = 252_002;
const NONEXISTENT_FILM_ID: u64 = 29_999_999_999;
const SEARCH_TITLE: &str = "Интерстеллар";
const SEARCH_TITLE_EN: &str = "Interstellar";
const GENRE_CATEGORY: u32 = 8;
const GENRE: &str = "Фантастика";
const NAVIGATION_QUERIES: [&str; 2] = ["Матрица", "Игра престолов"];
const ADVANCED_TITLE: &str = "Начало";
const ADVANCED_YEAR: &str = "2010";

/// Body of an API scenario
pub type ApiFlow = fn(&ApiClient) -> KinoResult<()>;

/// Body of a browser scenario
pub type UiFlow = fn(&mut dyn Driver, &SuiteConfig) -> KinoResult<()>;

/// What a scenario needs to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Needs an [`ApiClient`]
    Api,
    /// Needs the shared browser session
    Ui,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Api => "api",
            Self::Ui => "ui",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Flow {
    Api(ApiFlow),
    Ui(UiFlow),
}

/// One named check
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Scenario {
    /// Stable identifier
    pub id: &'static str,
    /// Human-readable title
    pub title: &'static str,
    /// Selection markers
    pub markers: &'static [Marker],
    /// What it needs to run
    pub kind: ScenarioKind,
    #[serde(skip)]
    pub(crate) flow: Flow,
}

impl Scenario {
    /// API scenario
    #[must_use]
    pub const fn api(
        id: &'static str,
        title: &'static str,
        markers: &'static [Marker],
        flow: ApiFlow,
    ) -> Self {
        Self {
            id,
            title,
            markers,
            kind: ScenarioKind::Api,
            flow: Flow::Api(flow),
        }
    }

    /// Browser scenario
    #[must_use]
    pub const fn ui(
        id: &'static str,
        title: &'static str,
        markers: &'static [Marker],
        flow: UiFlow,
    ) -> Self {
        Self {
            id,
            title,
            markers,
            kind: ScenarioKind::Ui,
            flow: Flow::Ui(flow),
        }
    }
}

/// The built-in suite, API scenarios first
#[must_use]
pub fn catalogue() -> Vec<Scenario> {
    use Marker::{Api, Regression, Smoke, Ui};
    vec![
        Scenario::api(
            "api_search_by_keyword",
            "Search films by keyword",
            &[Api, Smoke],
            api_search_by_keyword,
        ),
        Scenario::api(
            "api_search_with_filters",
            "Search films with filters",
            &[Api, Smoke],
            api_search_with_filters,
        ),
        Scenario::api("api_top_250", "Top 250 films", &[Api, Smoke], api_top_250),
        Scenario::api(
            "api_missing_key",
            "Request without an API key is rejected",
            &[Api, Regression],
            api_missing_key,
        ),
        Scenario::api(
            "api_nonexistent_film",
            "Request for a nonexistent film is rejected",
            &[Api, Regression],
            api_nonexistent_film,
        ),
        Scenario::ui(
            "TC-101",
            "Search for a film and open its page",
            &[Ui, Smoke],
            search_and_open_film,
        ),
        Scenario::ui("TC-102", "Genre navigation", &[Ui, Smoke], genre_navigation),
        Scenario::ui("TC-103", "Top 250 list", &[Ui, Regression], top_250_list),
        Scenario::ui("TC-104", "Main navigation", &[Ui, Smoke], main_navigation),
        Scenario::ui("TC-105", "Advanced search", &[Ui, Regression], advanced_search),
    ]
}

// =============================================================================
// API FLOWS
// =============================================================================

fn api_search_by_keyword(client: &ApiClient) -> KinoResult<()> {
    let response = client.search_by_keyword(KEYWORD)?;
    ApiAssertion::status(&response, 200).check()?;
    ApiAssertion::latency_under(&response, KEYWORD_LATENCY_LIMIT).check()?;
    ApiAssertion::non_empty_array(&response, "films").check()?;
    ApiAssertion::first_item_has(&response, "films", "filmId").check()?;
    ApiAssertion::first_item_has_any(&response, "films", &["nameRu", "nameEn"]).check()
}

fn api_search_with_filters(client: &ApiClient) -> KinoResult<()> {
    let filter = FilmFilter {
        country: Some(1),
        genre: Some(11),
        order: Some("RATING".to_string()),
        kind: Some("FILM".to_string()),
        rating: Some((7, 10)),
        years: Some((2020, 2020)),
        page: Some(1),
    };
    let response = client.films_filtered(&filter)?;
    ApiAssertion::status(&response, 200).check()?;
    ApiAssertion::non_empty_array(&response, "items").check()?;
    for field in ["kinopoiskId", "genres", "countries"] {
        ApiAssertion::first_item_has(&response, "items", field).check()?;
    }
    Ok(())
}

fn api_top_250(client: &ApiClient) -> KinoResult<()> {
    let response = client.top(TopList::Best250, 1)?;
    ApiAssertion::status(&response, 200).check()?;
    ApiAssertion::non_empty_array(&response, "films").check()?;
    ApiAssertion::first_item_has(&response, "films", "filmId").check()?;
    ApiAssertion::first_item_has(&response, "films", "rating").check()
}

fn api_missing_key(client: &ApiClient) -> KinoResult<()> {
    let response = client.film_without_key(KNOWN_FILM_ID)?;
    ApiAssertion::status(&response, 401).check()?;
    ApiAssertion::error_message(&response).check()
}

fn api_nonexistent_film(client: &ApiClient) -> KinoResult<()> {
    let response = client.film(NONEXISTENT_FILM_ID)?;
    ApiAssertion::status(&response, 400).check()?;
    ApiAssertion::error_message(&response).check()
}

// =============================================================================
// BROWSER FLOWS
// =============================================================================

fn base<'a>(driver: &'a mut (dyn Driver + 'a), config: &SuiteConfig) -> BasePage<'a, dyn Driver + 'a> {
    BasePage::new(driver, config.base_url.as_str(), config.ui_wait)
        .with_resolver(Resolver::with_waiter(Waiter::with_poll_interval(config.poll_interval)))
}

/// Run a step whose failure should degrade the scenario, not fail it.
///
/// Check failures are logged and swallowed; anything else propagates.
fn soft<T>(step: &str, result: KinoResult<T>) -> KinoResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_assertion() => {
            warn!(step, error = %err, "step degraded");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn report_film_links<D: Driver + ?Sized>(lists: &mut ListsPage<'_, D>) -> KinoResult<()> {
    match lists.film_links(None)? {
        Resolution::Success { resolved, .. } => {
            info!(count = resolved.into_elements().len(), "film links found");
        }
        Resolution::Exhausted { .. } => warn!("no film links on the page"),
    }
    Ok(())
}

fn search_and_open_film(driver: &mut dyn Driver, config: &SuiteConfig) -> KinoResult<()> {
    let mut main = MainPage::new(base(driver, config));
    main.open_main_page()?;
    let title = main.base().title()?;
    if !title.contains(SITE_TITLE) {
        return Err(KinoError::assertion(format!(
            "page title {title:?} does not mention {SITE_TITLE}"
        )));
    }

    main.search_film(SEARCH_TITLE)?;
    match main.open_film_any(&[SEARCH_TITLE, SEARCH_TITLE_EN], None) {
        Ok(url) => {
            info!(url = %url, "film page opened");
            Ok(())
        }
        Err(err) if err.is_assertion() => {
            Err(KinoError::skipped(format!("could not open a film page: {err}")))
        }
        Err(err) => Err(err),
    }
}

fn genre_navigation(driver: &mut dyn Driver, config: &SuiteConfig) -> KinoResult<()> {
    let mut lists = ListsPage::new(base(driver, config));
    lists.open_genre_category(GENRE_CATEGORY)?;
    if !lists.select_genre(GENRE, None)?.is_success() {
        warn!(genre = GENRE, "genre link not found, staying on the category page");
    }
    report_film_links(&mut lists)
}

fn top_250_list(driver: &mut dyn Driver, config: &SuiteConfig) -> KinoResult<()> {
    let mut lists = ListsPage::new(base(driver, config));
    lists.open_top250()?;
    report_film_links(&mut lists)
}

fn main_navigation(driver: &mut dyn Driver, config: &SuiteConfig) -> KinoResult<()> {
    {
        let mut lists = ListsPage::new(base(&mut *driver, config));
        for section in Section::ALL {
            if soft(section.label(), lists.open_section(section))?.is_some() {
                info!(%section, "section available");
            }
        }
    }

    for query in NAVIGATION_QUERIES {
        let mut main = MainPage::new(base(&mut *driver, config));
        let searched = main
            .open_main_page()
            .and_then(|()| main.search_with_enter(query));
        if soft(query, searched)?.is_some() {
            info!(query, "search completed");
        }
    }
    Ok(())
}

fn advanced_search(driver: &mut dyn Driver, config: &SuiteConfig) -> KinoResult<()> {
    MainPage::new(base(&mut *driver, config)).open_main_page()?;

    let mut search = SearchPage::new(base(driver, config));
    search.open()?;
    let url = search.base().current_url()?;
    let title = search.base().title()?;
    debug!(url = %url, title = %title, "advanced search page");

    soft("film name", search.enter_film_name(ADVANCED_TITLE))?;
    soft("year", search.enter_year(ADVANCED_YEAR))?;
    soft("submit", search.perform_search())?;
    if !search.results_visible(None)? {
        warn!("search results not displayed");
    }
    Ok(())
}
