//! Home page: header search and top-level navigation.

use super::{FILM_LINK, RESULTS_CONTAINER};
use crate::condition::Condition;
use crate::driver::{Driver, ElementHandle};
use crate::locator::{CandidateList, Locator};
use crate::page_object::{xpath_literal, BasePage, PageObject};
use crate::result::KinoResult;
use std::time::Duration;
use tracing::{info, warn};

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZАБВГДЕЁЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyzабвгдеёжзийклмнопрстуфхцчшщъыьэюя";

/// Film link candidates for any of `titles`: exact mentions first, then
/// case-insensitive ones.
fn film_title_candidates(titles: &[&str]) -> CandidateList {
    let exact = titles.iter().map(|title| {
        let literal = xpath_literal(title);
        Locator::xpath(format!("//a[contains(text(), {literal}) or contains(@title, {literal})]"))
    });
    let folded = titles.iter().map(|title| {
        let needle = xpath_literal(&title.to_lowercase());
        Locator::xpath(format!(
            "//a[contains(translate(., '{UPPER}', '{LOWER}'), {needle}) \
             or contains(translate(@title, '{UPPER}', '{LOWER}'), {needle})]"
        ))
    });
    CandidateList::new(exact.chain(folded).collect())
}

/// Kinopoisk home page
#[derive(Debug)]
pub struct MainPage<'d, D: Driver + ?Sized> {
    base: BasePage<'d, D>,
    search_input: CandidateList,
    search_buttons: CandidateList,
    search_results: Locator,
    film_links: CandidateList,
    advanced_search: Locator,
    movies_menu: Locator,
    series_menu: Locator,
    favorite_button: Locator,
}

impl<'d, D: Driver + ?Sized> MainPage<'d, D> {
    /// Wrap a bound base page
    pub fn new(base: BasePage<'d, D>) -> Self {
        Self {
            base,
            search_input: CandidateList::from_selectors(&[
                "input[name='kp_query']",
                "input[placeholder*='фильм']",
                "input[type='search']",
            ]),
            search_buttons: CandidateList::from_selectors(&[
                "button[type='submit']",
                ".header-fresh-search-button",
                ".search-btn",
                "input[type='submit']",
                "[data-tid='search_button']",
            ]),
            search_results: Locator::css(RESULTS_CONTAINER),
            film_links: CandidateList::from_selectors(&[
                FILM_LINK,
                ".search_results a",
                ".name a",
                ".styles_root__tiG8t a",
            ]),
            advanced_search: Locator::xpath("//a[contains(text(), 'расширенный поиск')]"),
            movies_menu: Locator::xpath("//a[contains(text(), 'Фильмы')]"),
            series_menu: Locator::xpath("//a[contains(text(), 'Сериалы')]"),
            favorite_button: Locator::css("[data-test-id='favorite-button']"),
        }
    }

    /// Underlying base page
    pub fn base(&mut self) -> &mut BasePage<'d, D> {
        &mut self.base
    }

    /// Load the site root and wait for `<body>`
    pub fn open_main_page(&mut self) -> KinoResult<()> {
        let url = self.base.base_url().to_string();
        self.base.open(&url)?;
        self.base.wait_loaded(None)
    }

    /// Type a query into the header search box
    pub fn enter_search_query(&mut self, query: &str) -> KinoResult<ElementHandle> {
        self.base.type_text(&self.search_input, query)
    }

    /// Submit via the first clickable search button, or Enter in `input`
    pub fn submit_search(&mut self, input: &ElementHandle) -> KinoResult<()> {
        let resolution = self
            .base
            .resolve(&self.search_buttons, &Condition::Clickable, None)?;
        if resolution.is_success() {
            let button = resolution.into_element()?;
            return self.base.click_element(&button);
        }
        warn!("no search button resolved, submitting with Enter");
        self.base.press_enter(input)
    }

    /// Wait for a results container
    pub fn wait_for_results(&mut self, timeout: Option<Duration>) -> KinoResult<ElementHandle> {
        self.base.find_element(&self.search_results, timeout)
    }

    /// Type, submit, wait for results
    pub fn search_film(&mut self, query: &str) -> KinoResult<()> {
        info!(query, "search film");
        let input = self.enter_search_query(query)?;
        self.submit_search(&input)?;
        self.wait_for_results(None).map(|_| ())
    }

    /// Type and submit with Enter only
    pub fn search_with_enter(&mut self, query: &str) -> KinoResult<()> {
        let input = self.enter_search_query(query)?;
        self.base.press_enter(&input)?;
        self.wait_for_results(None).map(|_| ())
    }

    /// Open a film from the results, returning the film page URL.
    ///
    /// Prefers a link mentioning `title`; otherwise the first film link.
    pub fn open_film(&mut self, title: &str, timeout: Option<Duration>) -> KinoResult<String> {
        self.open_film_any(&[title], timeout)
    }

    /// Like [`open_film`](Self::open_film), accepting any of several titles
    /// (e.g. the Russian and English names) in any letter case.
    pub fn open_film_any(&mut self, titles: &[&str], timeout: Option<Duration>) -> KinoResult<String> {
        let by_title = film_title_candidates(titles);
        let resolution = self.base.resolve(by_title, &Condition::Clickable, timeout)?;
        let link = if resolution.is_success() {
            resolution.into_element()?
        } else {
            warn!(?titles, "no link mentions the title, opening the first film");
            self.base.find_clickable(&self.film_links, timeout)?
        };

        self.base.click_element(&link)?;
        self.base.wait_for_url("/film/", timeout)
    }

    /// Follow the advanced search link
    pub fn open_advanced_search(&mut self) -> KinoResult<()> {
        self.base.click(&self.advanced_search).map(|_| ())
    }

    /// Follow the movies menu entry
    pub fn go_to_movies_section(&mut self) -> KinoResult<()> {
        self.base.click(&self.movies_menu).map(|_| ())
    }

    /// Follow the series menu entry
    pub fn go_to_series_section(&mut self) -> KinoResult<()> {
        self.base.click(&self.series_menu).map(|_| ())
    }

    /// Press the favourite button
    pub fn add_to_favorite(&mut self) -> KinoResult<()> {
        self.base.click(&self.favorite_button).map(|_| ())
    }
}

impl<D: Driver + ?Sized> PageObject for MainPage<'_, D> {
    fn url_pattern(&self) -> &str {
        "/"
    }

    fn page_name(&self) -> &str {
        "MainPage"
    }
}
