//! HTTP method-compliance probe for search-engine REST endpoints.
//!
//! # Overview
//! Checks that a running server answers `OPTIONS` with a correct `Allow`
//! header, rejects unsupported methods with `405 Method Not Allowed`, and
//! routes `POST /{index}/_settings` to the PUT/GET settings handler.
//!
//! # Design
//! - `ComplianceProbe` is stateless: it holds the base URL and index name.
//! - Each scenario is split into `build_*` (produces a request) and
//!   `check_*` (consumes the transport result), so the I/O boundary is
//!   explicit and every check can be driven by canned responses.
//! - Transports return `Result<HttpResponse, RequestError>`; a rejected
//!   request carries its full response in `RequestError::Status`.

pub mod allow;
pub mod config;
pub mod error;
pub mod expect;
pub mod http;
pub mod probe;
pub mod report;
pub mod transport;

pub use allow::AllowSet;
pub use config::ProbeConfig;
pub use error::{ProbeError, RequestError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use probe::{ComplianceProbe, Scenario};
pub use report::{Report, ScenarioOutcome};
pub use transport::{Transport, UreqTransport};
