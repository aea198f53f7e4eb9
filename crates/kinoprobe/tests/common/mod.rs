// Shared fixtures: a stub film API on a background runtime and a fake
// Kinopoisk site for the in-memory driver.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code, clippy::expect_used)]

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use kinoprobe::fake_dom::{FakeDriver, FakeElement, FakePage};
use kinoprobe::scenario::SuiteConfig;
use kinoprobe::{BrowserSession, Driver, KinoError, KinoResult, SessionConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::runtime::Runtime;

pub const API_KEY: &str = "test-key";
pub const SITE: &str = "https://kino.test/";

type Reply = (StatusCode, Json<Value>);

/// Stub film API served from its own runtime so blocking clients can call it
pub struct StubApi {
    addr: SocketAddr,
    _runtime: Runtime,
}

impl StubApi {
    /// Start on a random local port
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("Failed to build stub runtime");

        let app = Router::new()
            .route("/api/v2.1/films/search-by-keyword", get(search_by_keyword))
            .route("/api/v2.2/films", get(films_filtered))
            .route("/api/v2.2/films/top", get(top))
            .route("/api/v2.2/films/{id}", get(film));

        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .expect("Failed to bind stub API");
        let addr = listener.local_addr().expect("Failed to get local address");

        runtime.spawn(async move {
            axum::serve(listener, app).await.expect("Stub API failed");
        });

        Self {
            addr,
            _runtime: runtime,
        }
    }

    /// Base URL of the stub
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn unauthorized(headers: &HeaderMap) -> Option<Reply> {
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(API_KEY) => None,
        _ => Some((
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "You don't have permissions. See https://kinopoiskapiunofficial.tech"})),
        )),
    }
}

fn bad_request(message: &str) -> Reply {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message })))
}

async fn search_by_keyword(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Reply {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    let Some(keyword) = params.get("keyword") else {
        return bad_request("keyword is required");
    };
    (
        StatusCode::OK,
        Json(json!({
            "keyword": keyword,
            "pagesCount": 1,
            "searchFilmsCountResult": 1,
            "films": [{
                "filmId": 840_372,
                "nameRu": "Миньоны",
                "year": "2015",
                "rating": "6.4",
                "genres": [{"genre": "мультфильм"}],
                "countries": [{"country": "США"}]
            }]
        })),
    )
}

async fn films_filtered(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Reply {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    for required in ["countries", "genres", "order", "type", "ratingFrom", "ratingTo", "yearFrom", "yearTo", "page"] {
        if !params.contains_key(required) {
            return bad_request(&format!("{required} is required"));
        }
    }
    (
        StatusCode::OK,
        Json(json!({
            "total": 1,
            "totalPages": 1,
            "items": [{
                "kinopoiskId": 1_143_242,
                "nameRu": "Довод",
                "nameOriginal": "Tenet",
                "year": 2020,
                "ratingKinopoisk": 7.6,
                "genres": [{"genre": "фантастика"}],
                "countries": [{"country": "США"}]
            }]
        })),
    )
}

async fn top(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Reply {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    if params.get("type").map(String::as_str) != Some("TOP_250_BEST_FILMS") {
        return bad_request("unknown list type");
    }
    (
        StatusCode::OK,
        Json(json!({
            "pagesCount": 13,
            "films": [{"filmId": 326, "nameRu": "Побег из Шоушенка", "rating": "9.1"}]
        })),
    )
}

async fn film(headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    match id.parse::<u64>() {
        Ok(id) if id <= 10_000_000 => (
            StatusCode::OK,
            Json(json!({"kinopoiskId": id, "nameRu": "Зеленая миля"})),
        ),
        _ => bad_request("film id must be a number between 1 and 10000000"),
    }
}

/// Suite config pointing at the fake site, with short waits
pub fn suite_config() -> SuiteConfig {
    SuiteConfig {
        base_url: SITE.to_string(),
        ui_wait: Duration::from_millis(30),
        poll_interval: Duration::from_millis(5),
        ..SuiteConfig::default()
    }
}

/// Session whose launcher hands out `driver` once
pub fn fake_session(driver: FakeDriver) -> BrowserSession {
    let mut slot = Some(driver);
    BrowserSession::new(
        SessionConfig::default(),
        move |_: &SessionConfig| -> KinoResult<Box<dyn Driver>> {
            slot.take()
                .map(|d| Box::new(d) as Box<dyn Driver>)
                .ok_or_else(|| KinoError::transport("fake browser already launched"))
        },
    )
}

fn film_link(id: u32, title: &str) -> FakeElement {
    FakeElement::new("a")
        .attr("href", &format!("/film/{id}/"))
        .text(title)
        .navigates_to(&format!("{SITE}film/{id}/"))
}

fn film_list(url: &str, title: &str) -> FakePage {
    FakePage::new(url, title).with_body(vec![FakeElement::new("div").class("content").children([
        film_link(326, "Побег из Шоушенка"),
        film_link(435, "Зеленая миля"),
    ])])
}

/// Fake site with everything the browser scenarios visit.
///
/// The header search box only matches the third search-box candidate.
pub fn kinopoisk_site() -> FakeDriver {
    let results = format!("{SITE}search/");
    let home = FakePage::new(SITE, "Кинопоиск. Онлайн кинотеатр").with_body(vec![
        FakeElement::new("form").children([
            FakeElement::new("input")
                .attr("type", "search")
                .attr("name", "q")
                .submits_to(&results),
            FakeElement::new("button")
                .attr("type", "submit")
                .text("Найти")
                .navigates_to(&results),
        ]),
        FakeElement::new("a").text("Фильмы").navigates_to(&format!("{SITE}lists/categories/movies/1/")),
    ]);

    let search_results = FakePage::new(&results, "Результаты поиска").with_body(vec![
        FakeElement::new("div").class("search_results").children([
            FakeElement::new("p").class("name").child(film_link(258_687, "Интерстеллар")),
            FakeElement::new("p").class("name").child(film_link(301, "Матрица")),
        ]),
    ]);

    let advanced = FakePage::new(&format!("{SITE}s/"), "Расширенный поиск").with_body(vec![
        FakeElement::new("form").children([
            FakeElement::new("input").attr("name", "film_name").attr("type", "text"),
            FakeElement::new("input").attr("name", "year").attr("type", "number"),
            FakeElement::new("input")
                .attr("type", "submit")
                .attr("value", "Найти")
                .navigates_to(&results),
        ]),
    ]);

    let genres = FakePage::new(&format!("{SITE}lists/categories/movies/8/"), "Жанры").with_body(vec![
        FakeElement::new("a")
            .attr("href", "/lists/movies/genre--fantastika/")
            .child(FakeElement::new("div").text("Фантастика"))
            .navigates_to(&format!("{SITE}lists/movies/genre--fantastika/")),
    ]);

    FakeDriver::new()
        .with_page(home)
        .with_page(search_results)
        .with_page(advanced)
        .with_page(genres)
        .with_page(film_list(&format!("{SITE}lists/movies/genre--fantastika/"), "Фантастика"))
        .with_page(film_list(&format!("{SITE}lists/movies/top250/"), "250 лучших фильмов"))
        .with_page(film_list(&format!("{SITE}lists/categories/movies/1/"), "Фильмы"))
        .with_page(film_list(&format!("{SITE}lists/categories/series/1/"), "Сериалы"))
        .with_page(FakePage::new(&format!("{SITE}film/258687/"), "Интерстеллар (2014)"))
        .with_page(FakePage::new(&format!("{SITE}film/301/"), "Матрица (1999)"))
}
