//! Assertion helpers shared by the scenarios.
//!
//! Each helper inspects one aspect of a response and turns a mismatch into
//! the matching `ProbeError` variant.

use crate::allow::AllowSet;
use crate::error::{ProbeError, RequestError};
use crate::http::HttpResponse;

pub const ALLOW: &str = "Allow";

/// Require the request to have succeeded and return its response.
pub fn expect_success(
    result: Result<HttpResponse, RequestError>,
) -> Result<HttpResponse, ProbeError> {
    result.map_err(ProbeError::from)
}

/// Require the request to have been rejected with `expected` and return the
/// response carried by the error.
pub fn expect_failure(
    result: Result<HttpResponse, RequestError>,
    expected: u16,
) -> Result<HttpResponse, ProbeError> {
    match result {
        Ok(response) => Err(ProbeError::UnexpectedSuccess {
            expected,
            actual: response.status,
        }),
        Err(RequestError::Status(response)) => {
            expect_status(&response, expected)?;
            Ok(response)
        }
        Err(RequestError::Transport(msg)) => Err(ProbeError::Transport(msg)),
    }
}

pub fn expect_status(response: &HttpResponse, expected: u16) -> Result<(), ProbeError> {
    if response.status == expected {
        Ok(())
    } else {
        Err(ProbeError::UnexpectedStatus {
            expected,
            actual: response.status,
        })
    }
}

/// The `Allow` header must be present and name exactly `expected`.
pub fn expect_allow(response: &HttpResponse, expected: &AllowSet) -> Result<(), ProbeError> {
    let value = response
        .header(ALLOW)
        .ok_or_else(|| ProbeError::MissingHeader(ALLOW.to_string()))?;
    let actual = AllowSet::parse(value)?;
    if &actual == expected {
        Ok(())
    } else {
        Err(ProbeError::AllowMismatch {
            expected: expected.clone(),
            actual,
        })
    }
}

pub fn expect_body_contains(response: &HttpResponse, needle: &str) -> Result<(), ProbeError> {
    if response.body.contains(needle) {
        Ok(())
    } else {
        Err(ProbeError::MissingBodyText {
            needle: needle.to_string(),
            body: response.body.clone(),
        })
    }
}
