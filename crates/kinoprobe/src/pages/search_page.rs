//! Advanced search (`/s/`) and the result list it produces.

use super::RESULTS_CONTAINER;
use crate::condition::Condition;
use crate::driver::{Driver, ElementHandle};
use crate::locator::{CandidateList, Locator};
use crate::page_object::{xpath_literal, BasePage, PageObject};
use crate::result::KinoResult;
use std::time::Duration;
use tracing::{debug, warn};

/// Advanced search form
#[derive(Debug)]
pub struct SearchPage<'d, D: Driver + ?Sized> {
    base: BasePage<'d, D>,
    film_name_input: CandidateList,
    year_input: CandidateList,
    country_select: Locator,
    genre_select: Locator,
    sort_dropdown: Locator,
    search_buttons: CandidateList,
    search_results: Locator,
    results_panel: CandidateList,
    genres_filter: Locator,
    fantasy_genre: Locator,
    best_20_films: Locator,
    sort_by_rating: Locator,
    sort_by_name: Locator,
    film_item: Locator,
    favorite_icon: Locator,
    context_menu: Locator,
    add_to_favorites: Locator,
}

impl<'d, D: Driver + ?Sized> SearchPage<'d, D> {
    /// Wrap a bound base page
    pub fn new(base: BasePage<'d, D>) -> Self {
        Self {
            base,
            film_name_input: CandidateList::from_selectors(&[
                "input[name='film_name']",
                "input[name='kp_query']",
                "input[placeholder*='фильм']",
                "input[placeholder*='названи']",
                "input[name*='name']",
                "input[name*='title']",
                ".header-fresh-search-input",
                "[data-tid='search_input']",
                "#find_film",
                ".textfield__input",
                "//input[contains(@class, 'textfield')]",
                "input[type='text']",
            ]),
            year_input: CandidateList::from_selectors(&[
                "input[name='year']",
                "input[name*='year']",
                "input[placeholder*='год']",
                "#year",
                "input[name*='m_act[year]']",
                "//input[contains(@placeholder, 'год')]",
                "input[type='number']",
            ]),
            country_select: Locator::css("select[name='country']"),
            genre_select: Locator::css("select[name='genre']"),
            sort_dropdown: Locator::css("select[name='sort']"),
            search_buttons: CandidateList::from_selectors(&[
                "button[type='submit']",
                "[type='submit']",
                ".header-fresh-search-button",
                ".search-btn",
                "//button[contains(text(), 'Найти')]",
                "//span[contains(text(), 'Найти')]",
            ]),
            search_results: Locator::css(".search_results .item"),
            results_panel: CandidateList::from_selectors(&[
                RESULTS_CONTAINER,
                ".content",
                super::FILM_LINK,
            ]),
            genres_filter: Locator::xpath("//a[contains(text(), 'Жанры')]"),
            fantasy_genre: Locator::xpath(
                "//a[contains(text(), 'фантастика') or contains(text(), 'Фантастика')]",
            ),
            best_20_films: Locator::xpath(
                "//a[contains(text(), 'лучшие 20') or contains(text(), 'Лучшие 20')]",
            ),
            sort_by_rating: Locator::xpath("//option[contains(text(), 'рейтингу')]"),
            sort_by_name: Locator::xpath("//option[contains(text(), 'названию')]"),
            film_item: Locator::css(".film-item, .movie-item"),
            favorite_icon: Locator::css(".favorite-icon, .bookmark-icon"),
            context_menu: Locator::css(".context-menu, .dropdown-toggle"),
            add_to_favorites: Locator::xpath("//a[contains(text(), 'Любимые фильмы')]"),
        }
    }

    /// Underlying base page
    pub fn base(&mut self) -> &mut BasePage<'d, D> {
        &mut self.base
    }

    /// Load `/s/`
    pub fn open(&mut self) -> KinoResult<()> {
        self.base.open_path("s/", None)
    }

    /// Fill in the film title
    pub fn enter_film_name(&mut self, name: &str) -> KinoResult<()> {
        self.base.type_text(&self.film_name_input, name).map(|_| ())
    }

    /// Fill in the release year
    pub fn enter_year(&mut self, year: &str) -> KinoResult<()> {
        self.base.type_text(&self.year_input, year).map(|_| ())
    }

    /// Click the country option whose text contains `country`
    pub fn select_country(&mut self, country: &str) -> KinoResult<()> {
        let option = Locator::xpath(format!(
            "//option[contains(text(), {})]",
            xpath_literal(country)
        ));
        self.base.click(option).map(|_| ())
    }

    /// Pick a country by its visible name in the country select
    pub fn choose_country(&mut self, country: &str) -> KinoResult<()> {
        self.base
            .select_dropdown_by_visible_text(&self.country_select, country)
    }

    /// Pick a genre by its option value
    pub fn select_genre(&mut self, value: &str) -> KinoResult<()> {
        self.base.select_dropdown_by_value(&self.genre_select, value)
    }

    /// Submit via the first clickable button, or Enter in the title field
    pub fn perform_search(&mut self) -> KinoResult<()> {
        let resolution = self
            .base
            .resolve(&self.search_buttons, &Condition::Clickable, None)?;
        if resolution.is_success() {
            let button = resolution.into_element()?;
            return self.base.click_element(&button);
        }

        warn!("no search button resolved, submitting with Enter");
        let field = self
            .base
            .find_element(&self.film_name_input, Some(Duration::ZERO))?;
        self.base.press_enter(&field)
    }

    /// Whether a results container is displayed
    pub fn results_visible(&mut self, timeout: Option<Duration>) -> KinoResult<bool> {
        self.base.is_visible(&self.results_panel, timeout)
    }

    /// Open the genre filter
    pub fn select_genre_filter(&mut self) -> KinoResult<()> {
        self.base.click(&self.genres_filter).map(|_| ())
    }

    /// Follow the fantasy genre link
    pub fn select_fantasy_genre(&mut self) -> KinoResult<()> {
        self.base.click(&self.fantasy_genre).map(|_| ())
    }

    /// Follow the "best 20" link
    pub fn open_best_20_films(&mut self) -> KinoResult<()> {
        self.base.click(&self.best_20_films).map(|_| ())
    }

    /// Sort results by rating
    pub fn sort_by_rating(&mut self) -> KinoResult<()> {
        self.base.click(&self.sort_dropdown)?;
        self.base.click(&self.sort_by_rating).map(|_| ())
    }

    /// Sort results by title
    pub fn sort_by_name(&mut self) -> KinoResult<()> {
        self.base.click(&self.sort_dropdown)?;
        self.base.click(&self.sort_by_name).map(|_| ())
    }

    /// Open the context menu of the `index`-th film; `false` if there is none
    pub fn open_film_context_menu(&mut self, index: usize) -> KinoResult<bool> {
        let menus = self.base.find_all(&self.context_menu)?;
        let Some(menu) = menus.get(index) else {
            debug!(index, found = menus.len(), "no context menu at index");
            return Ok(false);
        };
        self.base.click_element(menu)?;
        Ok(true)
    }

    /// Choose "favourite films" in an open context menu
    pub fn add_to_favorites_via_menu(&mut self) -> KinoResult<()> {
        self.base.click(&self.add_to_favorites).map(|_| ())
    }

    /// Film cards on the page right now
    pub fn film_items(&mut self) -> KinoResult<Vec<ElementHandle>> {
        self.base.find_all(&self.film_item)
    }

    /// Click the favourite icon of the `index`-th film; `false` if there is none
    pub fn toggle_favorite_icon(&mut self, index: usize) -> KinoResult<bool> {
        let icons = self.base.find_all(&self.favorite_icon)?;
        match icons.get(index) {
            Some(icon) => self.base.click_element(icon).map(|()| true),
            None => Ok(false),
        }
    }

    /// Number of result items right now
    pub fn search_results_count(&mut self) -> KinoResult<usize> {
        Ok(self.base.find_all(&self.search_results)?.len())
    }

    /// Whether any result item is present right now
    pub fn has_search_results(&mut self) -> KinoResult<bool> {
        Ok(self.search_results_count()? > 0)
    }
}

impl<D: Driver + ?Sized> PageObject for SearchPage<'_, D> {
    fn url_pattern(&self) -> &str {
        "/s/"
    }

    fn page_name(&self) -> &str {
        "SearchPage"
    }
}
