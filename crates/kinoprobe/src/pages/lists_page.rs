//! Category and top lists under `/lists/`.

use super::FILM_LINK;
use crate::condition::Condition;
use crate::driver::Driver;
use crate::locator::{CandidateList, Locator};
use crate::page_object::{xpath_literal, BasePage, PageObject};
use crate::resolver::Resolution;
use crate::result::KinoResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Positional path to the fantasy tile in the genre grid
const FANTASY_TILE: &str = "//*[@id='__next']/div[1]/div[2]/div[4]/div[2]/div/a[4]/div[1]";

/// Top-level catalogue sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    /// Films, first page
    Movies,
    /// Series, first page
    Series,
    /// Top 250 films
    Top250,
}

impl Section {
    /// Every section in menu order
    pub const ALL: [Self; 3] = [Self::Movies, Self::Series, Self::Top250];

    /// Site-relative path
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Movies => "lists/categories/movies/1/",
            Self::Series => "lists/categories/series/1/",
            Self::Top250 => "lists/movies/top250/",
        }
    }

    /// Menu label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Movies => "Фильмы",
            Self::Series => "Сериалы",
            Self::Top250 => "Топ 250",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// List pages
#[derive(Debug)]
pub struct ListsPage<'d, D: Driver + ?Sized> {
    base: BasePage<'d, D>,
    film_links: Locator,
}

impl<'d, D: Driver + ?Sized> ListsPage<'d, D> {
    /// Wrap a bound base page
    pub fn new(base: BasePage<'d, D>) -> Self {
        Self {
            base,
            film_links: Locator::css(FILM_LINK),
        }
    }

    /// Underlying base page
    pub fn base(&mut self) -> &mut BasePage<'d, D> {
        &mut self.base
    }

    /// Open a movie genre category by its numeric id
    pub fn open_genre_category(&mut self, id: u32) -> KinoResult<()> {
        self.base
            .open_path(&format!("lists/categories/movies/{id}/"), None)
    }

    /// Open the top 250 list
    pub fn open_top250(&mut self) -> KinoResult<()> {
        self.open_section(Section::Top250)
    }

    /// Open a catalogue section
    pub fn open_section(&mut self, section: Section) -> KinoResult<()> {
        debug!(%section, "open section");
        self.base.open_path(section.path(), None)
    }

    /// Click a genre link by name.
    ///
    /// The resolution is returned as-is so the caller can treat a missing
    /// genre as a soft step.
    pub fn select_genre(&mut self, name: &str, timeout: Option<Duration>) -> KinoResult<Resolution> {
        let literal = xpath_literal(name);
        let mut candidates = Vec::with_capacity(3);
        if name == "Фантастика" {
            candidates.push(Locator::xpath(FANTASY_TILE));
        }
        candidates.push(Locator::xpath(format!("//a[contains(text(), {literal})]")));
        candidates.push(Locator::xpath(format!("//a[contains(., {literal})]")));
        self.click_resolved(CandidateList::new(candidates), timeout)
    }

    fn click_resolved(
        &mut self,
        candidates: CandidateList,
        timeout: Option<Duration>,
    ) -> KinoResult<Resolution> {
        let resolution = self.base.resolve(candidates, &Condition::Clickable, timeout)?;
        if let Resolution::Success { resolved, .. } = &resolution {
            if let Some(element) = resolved.element() {
                self.base.click_element(element)?;
            }
        }
        Ok(resolution)
    }

    /// Wait for film links; exhaustion is returned, not raised
    pub fn film_links(&mut self, timeout: Option<Duration>) -> KinoResult<Resolution> {
        self.base
            .resolve(&self.film_links, &Condition::AllPresent, timeout)
    }
}

impl<D: Driver + ?Sized> PageObject for ListsPage<'_, D> {
    fn url_pattern(&self) -> &str {
        "/lists/**"
    }

    fn page_name(&self) -> &str {
        "ListsPage"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fake_dom::{FakeDriver, FakeElement, FakePage};
    use crate::resolver::Resolver;
    use crate::wait::Waiter;

    fn lists_page(driver: &mut FakeDriver) -> ListsPage<'_, FakeDriver> {
        let base = BasePage::new(driver, "https://kino.test/", Duration::from_millis(20))
            .with_resolver(Resolver::with_waiter(Waiter::with_poll_interval(Duration::from_millis(5))));
        ListsPage::new(base)
    }

    fn site() -> FakeDriver {
        let genres = FakePage::new("https://kino.test/lists/categories/movies/8/", "Жанры")
            .with_body(vec![
                FakeElement::new("a")
                    .attr("href", "/lists/movies/genre--fantastika/")
                    .child(FakeElement::new("div").text("Фантастика"))
                    .navigates_to("https://kino.test/lists/movies/genre--fantastika/"),
            ]);
        let fantasy = FakePage::new("https://kino.test/lists/movies/genre--fantastika/", "Фантастика")
            .with_body(vec![
                FakeElement::new("a").attr("href", "/film/1/").text("Дюна"),
                FakeElement::new("a").attr("href", "/film/2/").text("Матрица"),
            ]);
        FakeDriver::new().with_page(genres).with_page(fantasy)
    }

    #[test]
    fn test_section_paths() {
        assert_eq!(Section::Series.path(), "lists/categories/series/1/");
        assert_eq!(Section::Top250.to_string(), "Топ 250");
        assert_eq!(Section::ALL.len(), 3);
    }

    #[test]
    fn test_select_genre_falls_through_positional_path() {
        let mut driver = site();
        let mut page = lists_page(&mut driver);
        page.open_genre_category(8).unwrap();
        let resolution = page.select_genre("Фантастика", None).unwrap();
        assert!(resolution.is_success());
        assert_eq!(resolution.attempts().len(), 3);
        assert!(page.base().is_at("/lists/**").unwrap());

        let links = page.film_links(None).unwrap();
        let (resolved, _) = links.into_result().unwrap();
        assert_eq!(resolved.into_elements().len(), 2);
    }

    #[test]
    fn test_missing_genre_is_soft() {
        let mut driver = site();
        let mut page = lists_page(&mut driver);
        page.open_genre_category(8).unwrap();
        let resolution = page.select_genre("Вестерн", None).unwrap();
        assert!(!resolution.is_success());
        assert_eq!(
            page.base().current_url().unwrap(),
            "https://kino.test/lists/categories/movies/8/"
        );
    }

    #[test]
    fn test_empty_list_reports_exhaustion() {
        let mut driver = FakeDriver::new();
        let mut page = lists_page(&mut driver);
        page.open_top250().unwrap();
        assert!(!page.film_links(None).unwrap().is_success());
    }
}
