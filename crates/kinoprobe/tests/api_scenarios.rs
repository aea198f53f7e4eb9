//! API scenarios end to end against a local stub.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{StubApi, API_KEY};
use kinoprobe::api::{ApiAssertion, ApiClient, ApiConfig, FilmFilter, TopList};
use kinoprobe::fake_dom::FakeDriver;
use kinoprobe::scenario::{catalogue, select, MarkerExpr, Outcome, SuiteConfig, SuiteRunner};

fn runner(api: ApiConfig) -> SuiteRunner {
    let config = SuiteConfig {
        api: Some(api),
        ..common::suite_config()
    };
    SuiteRunner::with_session(config, common::fake_session(FakeDriver::new()))
}

fn outcome_of<'a>(report: &'a kinoprobe::scenario::RunReport, id: &str) -> &'a Outcome {
    &report
        .results
        .iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("{id} did not run"))
        .outcome
}

#[test]
fn test_all_api_scenarios_pass_with_valid_key() {
    let stub = StubApi::start();
    let all = catalogue();
    let expr = MarkerExpr::parse("api").unwrap();
    let selected = select(&all, Some(&expr));

    let report = runner(ApiConfig::new(stub.url()).with_api_key(API_KEY)).run(&selected);

    assert_eq!(report.results.len(), 5, "{report:#?}");
    assert_eq!(report.totals.passed, 5, "{report:#?}");
    assert!(report.success());
}

#[test]
fn test_keyed_request_rejected_with_401_fails() {
    let stub = StubApi::start();
    let all = catalogue();
    let expr = MarkerExpr::parse("api").unwrap();
    let selected = select(&all, Some(&expr));

    let report = runner(ApiConfig::new(stub.url()).with_api_key("wrong-key")).run(&selected);

    match outcome_of(&report, "api_top_250") {
        Outcome::Failed { message } => assert!(message.contains("401"), "{message}"),
        other => panic!("expected failure, got {other:?}"),
    }
    // Sending no key on purpose still gets the 401 it asserts on.
    assert_eq!(outcome_of(&report, "api_missing_key"), &Outcome::Passed);
    assert_eq!(report.totals.failed, 4);
    assert!(report.aborted.is_none());
}

#[test]
fn test_missing_key_aborts_keyed_run() {
    let stub = StubApi::start();
    let all = catalogue();
    let expr = MarkerExpr::parse("api and smoke").unwrap();
    let selected = select(&all, Some(&expr));

    let report = runner(ApiConfig::new(stub.url())).run(&selected);

    assert_eq!(report.results.len(), 1);
    assert!(report.aborted.as_deref().unwrap_or_default().contains("API_KEY"));
    assert!(!report.success());
}

#[test]
fn test_client_calls() {
    let stub = StubApi::start();
    let client = ApiClient::new(ApiConfig::new(stub.url()).with_api_key(API_KEY)).unwrap();

    let found = client.search_by_keyword("миньоны").unwrap();
    assert_eq!(found.status, 200);
    let decoded: kinoprobe::api::models::FilmSearchResponse = found.json().unwrap();
    assert_eq!(decoded.keyword.as_deref(), Some("миньоны"));

    let top = client.top(TopList::Best250, 1).unwrap();
    assert!(ApiAssertion::first_item_has(&top, "films", "rating").passed);

    // An incomplete filter set is a 400 from the stub.
    let partial = client
        .films_filtered(&FilmFilter {
            genre: Some(11),
            ..FilmFilter::default()
        })
        .unwrap();
    assert_eq!(partial.status, 400);
    assert!(ApiAssertion::error_message(&partial).passed);

    let rejected = client.film(29_999_999_999).unwrap();
    assert_eq!(rejected.status, 400);
    assert_eq!(client.film_without_key(252_002).unwrap().status, 401);
}

#[test]
fn test_unreachable_api_is_a_scenario_failure() {
    // Nothing listens on port 9 locally; the run continues past the failure.
    let all = catalogue();
    let expr = MarkerExpr::parse("api and regression").unwrap();
    let selected = select(&all, Some(&expr));

    let report = runner(ApiConfig::new("http://127.0.0.1:9").with_api_key(API_KEY)).run(&selected);

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.totals.failed, 2);
    assert!(report.aborted.is_none());
}
