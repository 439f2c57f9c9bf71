//! Error types for the compliance probe.
//!
//! # Design
//! `RequestError` is what a transport returns: either the server answered
//! with a non-success status (the full response rides along so callers can
//! inspect it) or the round-trip itself failed. `ProbeError` is what a
//! scenario check returns; every assertion the probe makes has its own
//! variant so reports say exactly which expectation broke.

use thiserror::Error;

use crate::allow::AllowSet;
use crate::http::HttpResponse;

/// Outcome of a failed `Transport::perform` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The server answered with status >= 400.
    #[error("HTTP {}: {}", .0.status, .0.body)]
    Status(HttpResponse),

    /// Connection refused, timeout, truncated body and similar I/O failures.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors returned by scenario checks.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("setup request {step} failed: {source}")]
    Setup {
        step: String,
        #[source]
        source: Box<ProbeError>,
    },

    #[error("expected status {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    /// A request that had to succeed was rejected; `body` carries the reason.
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Request should have failed with {expected} error")]
    UnexpectedSuccess { expected: u16, actual: u16 },

    #[error("response has no {0} header")]
    MissingHeader(String),

    #[error("malformed Allow header {value:?}: {reason}")]
    MalformedAllow { value: String, reason: String },

    #[error("expected Allow methods {expected}, got {actual}")]
    AllowMismatch { expected: AllowSet, actual: AllowSet },

    #[error("response body does not contain {needle:?}; body was {body:?}")]
    MissingBodyText { needle: String, body: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<RequestError> for ProbeError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Status(response) => ProbeError::Rejected {
                status: response.status,
                body: response.body,
            },
            RequestError::Transport(msg) => ProbeError::Transport(msg),
        }
    }
}
