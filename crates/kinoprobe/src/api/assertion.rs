//! Checks on API responses.

use super::client::ApiResponse;
use crate::result::{KinoError, KinoResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Whether the check passed
    pub passed: bool,
    /// Failure message, if any
    pub message: Option<String>,
}

impl AssertionResult {
    /// Create a passing result
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    /// Create a failing result
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
        }
    }

    /// Turn a failure into [`KinoError::AssertionFailed`]
    pub fn check(self) -> KinoResult<()> {
        if self.passed {
            Ok(())
        } else {
            Err(KinoError::assertion(
                self.message.unwrap_or_else(|| "check failed".to_string()),
            ))
        }
    }
}

/// Response checks
#[derive(Debug, Clone, Copy)]
pub struct ApiAssertion;

impl ApiAssertion {
    /// Status code equals `expected`
    #[must_use]
    pub fn status(response: &ApiResponse, expected: u16) -> AssertionResult {
        if response.status == expected {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!(
                "expected status {expected}, got {}: {}",
                response.status,
                snippet(&response.text)
            ))
        }
    }

    /// Response arrived strictly within `bound`
    #[must_use]
    pub fn latency_under(response: &ApiResponse, bound: Duration) -> AssertionResult {
        if response.elapsed < bound {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!(
                "response took {}ms, limit {}ms",
                response.elapsed.as_millis(),
                bound.as_millis()
            ))
        }
    }

    /// `body[key]` is a non-empty array
    #[must_use]
    pub fn non_empty_array(response: &ApiResponse, key: &str) -> AssertionResult {
        match response.body.get(key) {
            Some(Value::Array(items)) if !items.is_empty() => AssertionResult::pass(),
            Some(Value::Array(_)) => AssertionResult::fail(format!("'{key}' is empty")),
            Some(_) => AssertionResult::fail(format!("'{key}' is not an array")),
            None => AssertionResult::fail(format!("response has no '{key}'")),
        }
    }

    /// First element of `body[array]` has `field`
    #[must_use]
    pub fn first_item_has(response: &ApiResponse, array: &str, field: &str) -> AssertionResult {
        Self::first_item_has_any(response, array, &[field])
    }

    /// First element of `body[array]` has at least one of `fields`
    #[must_use]
    pub fn first_item_has_any(
        response: &ApiResponse,
        array: &str,
        fields: &[&str],
    ) -> AssertionResult {
        let Some(first) = first_item(&response.body, array) else {
            return AssertionResult::fail(format!("'{array}' has no first item"));
        };
        if fields.iter().any(|f| first.get(f).is_some()) {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!(
                "first item of '{array}' has none of: {}",
                fields.join(", ")
            ))
        }
    }

    /// Body is an error payload with a `message`
    #[must_use]
    pub fn error_message(response: &ApiResponse) -> AssertionResult {
        match response.body.get("message") {
            Some(Value::String(_)) => AssertionResult::pass(),
            _ => AssertionResult::fail(format!(
                "expected an error message, got: {}",
                snippet(&response.text)
            )),
        }
    }
}

/// First element of the array at `body[key]`
#[must_use]
pub fn first_item<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key)?.as_array()?.first()
}

fn snippet(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, ms: u64, body: Value) -> ApiResponse {
        ApiResponse {
            status,
            elapsed: Duration::from_millis(ms),
            text: body.to_string(),
            body,
        }
    }

    mod assertion_result_tests {
        use super::*;

        #[test]
        fn test_check() {
            assert!(AssertionResult::pass().check().is_ok());
            let err = AssertionResult::fail("nope").check().unwrap_err();
            assert!(err.is_assertion());
            assert!(err.to_string().contains("nope"));
        }
    }

    mod api_assertion_tests {
        use super::*;

        #[test]
        fn test_status() {
            let ok = response(200, 5, json!({}));
            assert!(ApiAssertion::status(&ok, 200).passed);
            let denied = response(401, 5, json!({"message": "no key"}));
            let result = ApiAssertion::status(&denied, 200);
            assert!(!result.passed);
            assert!(result.message.unwrap().contains("401"));
        }

        #[test]
        fn test_latency_bound_is_strict() {
            let bound = Duration::from_millis(1100);
            assert!(ApiAssertion::latency_under(&response(200, 1099, json!({})), bound).passed);
            assert!(!ApiAssertion::latency_under(&response(200, 1100, json!({})), bound).passed);
        }

        #[test]
        fn test_non_empty_array() {
            assert!(ApiAssertion::non_empty_array(&response(200, 1, json!({"films": [{}]})), "films").passed);
            assert!(!ApiAssertion::non_empty_array(&response(200, 1, json!({"films": []})), "films").passed);
            assert!(!ApiAssertion::non_empty_array(&response(200, 1, json!({"films": 3})), "films").passed);
            assert!(!ApiAssertion::non_empty_array(&response(200, 1, json!({})), "films").passed);
        }

        #[test]
        fn test_first_item_fields() {
            let resp = response(200, 1, json!({"films": [{"filmId": 1, "nameEn": "Minions"}]}));
            assert!(ApiAssertion::first_item_has(&resp, "films", "filmId").passed);
            assert!(ApiAssertion::first_item_has_any(&resp, "films", &["nameRu", "nameEn"]).passed);
            assert!(!ApiAssertion::first_item_has(&resp, "films", "rating").passed);
            assert!(!ApiAssertion::first_item_has(&resp, "items", "filmId").passed);
        }

        #[test]
        fn test_error_message() {
            assert!(ApiAssertion::error_message(&response(400, 1, json!({"message": "bad id"}))).passed);
            let non_json = ApiResponse {
                status: 500,
                elapsed: Duration::ZERO,
                body: Value::Null,
                text: "x".repeat(300),
            };
            let result = ApiAssertion::error_message(&non_json);
            assert!(!result.passed);
            assert!(result.message.unwrap().ends_with("..."));
        }
    }
}
