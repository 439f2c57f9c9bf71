//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! The probe only talks to the `Transport` trait, so scenario logic can be
//! driven by canned responses in unit tests. `UreqTransport` is the blocking
//! implementation used by the CLI and the integration tests. ureq's own
//! status-code-as-error behavior is disabled; the status is classified here so
//! that a rejected request still yields its headers and body.

use std::time::Duration;

use crate::error::RequestError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError>;
}

/// Turn a received response into the success/failure split.
pub fn classify(response: HttpResponse) -> Result<HttpResponse, RequestError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(RequestError::Status(response))
    }
}

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        tracing::debug!(method = %request.method, url = %request.path, "sending request");

        let agent = &self.agent;
        let url = request.path.as_str();
        let body = request.body.as_deref();
        let content_type = request
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
            .unwrap_or("application/json");

        let result = match (request.method, body) {
            (HttpMethod::Get, _) => agent.get(url).call(),
            (HttpMethod::Head, _) => agent.head(url).call(),
            (HttpMethod::Delete, _) => agent.delete(url).call(),
            (HttpMethod::Options, _) => agent.options(url).call(),
            (HttpMethod::Post, Some(body)) => {
                agent.post(url).content_type(content_type).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => agent.post(url).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                agent.put(url).content_type(content_type).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => agent.put(url).send_empty(),
        };
        let mut response = result.map_err(|e| RequestError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = if request.method == HttpMethod::Head {
            String::new()
        } else {
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| RequestError::Transport(e.to_string()))?
        };

        tracing::debug!(status, "received response");
        classify(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    #[test]
    fn classify_keeps_successes() {
        assert!(classify(response(200)).is_ok());
        assert!(classify(response(204)).is_ok());
        assert!(classify(response(301)).is_ok());
    }

    #[test]
    fn classify_wraps_errors_with_response() {
        let err = classify(response(405)).unwrap_err();
        assert!(matches!(err, RequestError::Status(r) if r.status == 405));
    }

    #[test]
    fn connection_refused_is_transport_error() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let transport = UreqTransport::new(Duration::from_secs(2));
        let request = HttpRequest {
            method: HttpMethod::Get,
            path: format!("http://{addr}/_tasks"),
            uri_path: "/_tasks".to_string(),
            headers: Vec::new(),
            body: None,
        };
        assert!(matches!(
            transport.perform(&request),
            Err(RequestError::Transport(_))
        ));
    }
}
