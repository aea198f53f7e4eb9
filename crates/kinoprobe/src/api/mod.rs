//! Film API client and response checks.
//!
//! Calls are blocking and independent of each other. Non-2xx statuses come
//! back as ordinary [`ApiResponse`] values so scenarios can assert on them.

mod assertion;
mod client;
pub mod models;

pub use assertion::{first_item, ApiAssertion, AssertionResult};
pub use client::{
    mask, ApiClient, ApiConfig, ApiRequest, ApiResponse, Auth, FilmFilter, TopList,
    API_KEY_HEADER, DEFAULT_REQUEST_TIMEOUT,
};
