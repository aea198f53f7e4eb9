//! Typed views of the film API payloads.
//!
//! Scenarios assert on the raw `serde_json::Value`; these types are for
//! callers that want the decoded shape. Every field the API may omit is
//! optional.

use serde::{Deserialize, Serialize};

/// Name/value pair used for genres and countries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    /// Genre name
    pub genre: String,
}

/// Production country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// Country name
    pub country: String,
}

/// Film entry in keyword search and top lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmSummary {
    /// Film id
    pub film_id: u64,
    /// Russian title
    pub name_ru: Option<String>,
    /// English title
    pub name_en: Option<String>,
    /// Year, as the API formats it
    pub year: Option<String>,
    /// Rating, as the API formats it (e.g. "8.6" or "99%")
    pub rating: Option<String>,
    /// Genres
    #[serde(default)]
    pub genres: Vec<Genre>,
    /// Countries
    #[serde(default)]
    pub countries: Vec<Country>,
}

/// `GET /api/v2.1/films/search-by-keyword`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmSearchResponse {
    /// Keyword echoed back
    pub keyword: Option<String>,
    /// Page count
    pub pages_count: Option<u32>,
    /// Total hits
    pub search_films_count_result: Option<u32>,
    /// Hits on this page
    pub films: Vec<FilmSummary>,
}

/// `GET /api/v2.2/films/top`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopFilmsResponse {
    /// Page count
    pub pages_count: Option<u32>,
    /// Films on this page
    pub films: Vec<FilmSummary>,
}

/// Film entry in filtered search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmItem {
    /// Film id
    pub kinopoisk_id: u64,
    /// Russian title
    pub name_ru: Option<String>,
    /// English title
    pub name_en: Option<String>,
    /// Original title
    pub name_original: Option<String>,
    /// Release year
    pub year: Option<u32>,
    /// Kinopoisk rating
    pub rating_kinopoisk: Option<f64>,
    /// Genres
    #[serde(default)]
    pub genres: Vec<Genre>,
    /// Countries
    #[serde(default)]
    pub countries: Vec<Country>,
}

/// `GET /api/v2.2/films`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmsPage {
    /// Total hits
    pub total: Option<u32>,
    /// Page count
    pub total_pages: Option<u32>,
    /// Films on this page
    pub items: Vec<FilmItem>,
}

/// Error payload for 4xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable reason
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_keyword_search() {
        let body = json!({
            "keyword": "миньоны",
            "pagesCount": 1,
            "films": [{
                "filmId": 840_372,
                "nameRu": "Миньоны",
                "year": "2015",
                "rating": "6.4",
                "genres": [{"genre": "мультфильм"}],
                "countries": [{"country": "США"}]
            }]
        });
        let decoded: FilmSearchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(decoded.films[0].film_id, 840_372);
        assert_eq!(decoded.films[0].name_en, None);
        assert_eq!(decoded.films[0].countries[0].country, "США");
    }

    #[test]
    fn test_decode_filtered_page_without_optional_fields() {
        let body = json!({"total": 1, "items": [{"kinopoiskId": 1, "genres": [], "countries": []}]});
        let decoded: FilmsPage = serde_json::from_value(body).unwrap();
        assert_eq!(decoded.items[0].kinopoisk_id, 1);
        assert!(decoded.items[0].rating_kinopoisk.is_none());
    }

    #[test]
    fn test_decode_error_body() {
        let decoded: ApiErrorBody =
            serde_json::from_value(json!({"message": "You don't have permissions"})).unwrap();
        assert!(decoded.message.contains("permissions"));
    }
}
