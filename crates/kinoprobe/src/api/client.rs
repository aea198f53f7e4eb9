//! Blocking HTTP client for the film API.

use crate::result::{KinoError, KinoResult};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Request timeout when nothing is configured
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// API endpoint and credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Scheme and host, without a trailing slash
    pub base_url: String,
    /// Key sent as `X-API-KEY`
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.masked_key())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    /// Config for a base URL with no key
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `API_BASE_URL` and `API_KEY` from the process environment
    pub fn from_env() -> KinoResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> KinoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let base_url = get("API_BASE_URL")
            .ok_or_else(|| KinoError::precondition("API_BASE_URL is not set"))?;
        let mut config = Self::new(base_url);
        config.api_key = get("API_KEY");
        Ok(config)
    }

    /// Key with all but the last four characters hidden
    #[must_use]
    pub fn masked_key(&self) -> Option<String> {
        self.api_key.as_deref().map(mask)
    }

    /// Default headers for keyed calls
    pub fn headers(&self) -> KinoResult<HeaderMap> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| KinoError::precondition("API_KEY is not set"))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(key)
                .map_err(|_| KinoError::precondition("API_KEY is not a valid header value"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Hide a secret for display
#[must_use]
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{visible}", "*".repeat(chars.len() - 4))
}

/// Whether a request carries the key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Auth {
    /// Send `X-API-KEY` and `Content-Type`
    Keyed,
    /// Send no headers at all
    Anonymous,
}

/// One outgoing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path below the base URL, starting with `/`
    pub path: String,
    /// Query parameters, in order
    pub params: Vec<(String, String)>,
    /// Header policy
    pub auth: Auth,
}

impl ApiRequest {
    /// Keyed GET
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            params: Vec::new(),
            auth: Auth::Keyed,
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Send without the key
    #[must_use]
    pub const fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }
}

/// What the assertions look at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status
    pub status: u16,
    /// Time until response headers arrived
    pub elapsed: Duration,
    /// Parsed body; `Null` when empty or not JSON
    pub body: Value,
    /// Raw body text
    pub text: String,
}

impl ApiResponse {
    /// Decode the body into a typed model
    pub fn json<T: DeserializeOwned>(&self) -> KinoResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Film list names accepted by the top endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopList {
    /// `TOP_250_BEST_FILMS`
    Best250,
    /// `TOP_100_POPULAR_FILMS`
    Popular100,
    /// `TOP_AWAIT_FILMS`
    Await,
}

impl TopList {
    /// Query value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Best250 => "TOP_250_BEST_FILMS",
            Self::Popular100 => "TOP_100_POPULAR_FILMS",
            Self::Await => "TOP_AWAIT_FILMS",
        }
    }
}

/// Filters for `GET /api/v2.2/films`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilmFilter {
    /// Country id
    pub country: Option<u32>,
    /// Genre id
    pub genre: Option<u32>,
    /// `RATING`, `NUM_VOTE` or `YEAR`
    pub order: Option<String>,
    /// `FILM`, `TV_SHOW`, `TV_SERIES`, `MINI_SERIES` or `ALL`
    pub kind: Option<String>,
    /// Inclusive rating range
    pub rating: Option<(u8, u8)>,
    /// Inclusive year range
    pub years: Option<(u16, u16)>,
    /// Page, from 1
    pub page: Option<u32>,
}

impl FilmFilter {
    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(country) = self.country {
            request = request.param("countries", country);
        }
        if let Some(genre) = self.genre {
            request = request.param("genres", genre);
        }
        if let Some(order) = &self.order {
            request = request.param("order", order);
        }
        if let Some(kind) = &self.kind {
            request = request.param("type", kind);
        }
        if let Some((from, to)) = self.rating {
            request = request.param("ratingFrom", from).param("ratingTo", to);
        }
        if let Some((from, to)) = self.years {
            request = request.param("yearFrom", from).param("yearTo", to);
        }
        if let Some(page) = self.page {
            request = request.param("page", page);
        }
        request
    }
}

/// Synchronous API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    /// Build a client
    pub fn new(config: ApiConfig) -> KinoResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    /// Endpoint and credentials
    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Send a request and capture status, latency and body.
    ///
    /// A 4xx or 5xx status is a normal response here; only transport
    /// failures are errors.
    pub fn send(&self, request: &ApiRequest) -> KinoResult<ApiResponse> {
        let url = format!("{}{}", self.config.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .query(&request.params);
        if request.auth == Auth::Keyed {
            builder = builder.headers(self.config.headers()?);
        }

        let started = Instant::now();
        let response = builder.send()?;
        let elapsed = started.elapsed();
        let status = response.status().as_u16();
        let text = response.text()?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);

        info!(
            method = %request.method,
            url = %url,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "api call"
        );
        Ok(ApiResponse {
            status,
            elapsed,
            body,
            text,
        })
    }

    /// `GET /api/v2.1/films/search-by-keyword`
    pub fn search_by_keyword(&self, keyword: &str) -> KinoResult<ApiResponse> {
        self.send(&ApiRequest::get("/api/v2.1/films/search-by-keyword").param("keyword", keyword))
    }

    /// `GET /api/v2.2/films` with filters
    pub fn films_filtered(&self, filter: &FilmFilter) -> KinoResult<ApiResponse> {
        self.send(&filter.apply(ApiRequest::get("/api/v2.2/films")))
    }

    /// `GET /api/v2.2/films/top`
    pub fn top(&self, list: TopList, page: u32) -> KinoResult<ApiResponse> {
        self.send(
            &ApiRequest::get("/api/v2.2/films/top")
                .param("type", list.as_str())
                .param("page", page),
        )
    }

    /// `GET /api/v2.2/films/{id}`
    pub fn film(&self, id: u64) -> KinoResult<ApiResponse> {
        self.send(&ApiRequest::get(format!("/api/v2.2/films/{id}")))
    }

    /// `GET /api/v2.2/films/{id}` with no headers
    pub fn film_without_key(&self, id: u64) -> KinoResult<ApiResponse> {
        self.send(&ApiRequest::get(format!("/api/v2.2/films/{id}")).anonymous())
    }
}
