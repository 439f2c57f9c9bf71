//! Request builders and response checks for the method-compliance scenarios.
//!
//! # Design
//! `ComplianceProbe` holds only the base URL and the index name; it carries
//! no mutable state between scenarios. Every scenario is split into
//! `build_*` methods that produce `HttpRequest` values and `check_*` methods
//! that consume what the transport returned. `run` wires the two together
//! through a `Transport` and collects a `Report`.

use crate::allow::AllowSet;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, RequestError};
use crate::expect::{
    expect_allow, expect_body_contains, expect_failure, expect_status, expect_success,
};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::report::{Report, ScenarioOutcome};
use crate::transport::Transport;

pub const TASKS_PATH: &str = "/_tasks";

const METHOD_NOT_ALLOWED: u16 = 405;
const ALREADY_EXISTS: &str = "resource_already_exists_exception";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// `OPTIONS /_tasks` answers 200 with `Allow: GET`.
    TasksOptions,
    /// `DELETE /_tasks` answers 405 naming the allowed methods.
    TasksUnsupportedMethod,
    /// `POST /{index}/_settings` is matched by the PUT/GET settings handler.
    IndexSettingsPost,
    /// `OPTIONS /{index}/_settings` answers 200 with `Allow: GET,PUT`.
    IndexSettingsOptions,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::TasksOptions,
        Scenario::TasksUnsupportedMethod,
        Scenario::IndexSettingsPost,
        Scenario::IndexSettingsOptions,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::TasksOptions => "tasks_options",
            Scenario::TasksUnsupportedMethod => "tasks_unsupported_method",
            Scenario::IndexSettingsPost => "index_settings_post",
            Scenario::IndexSettingsOptions => "index_settings_options",
        }
    }

    fn needs_index(&self) -> bool {
        matches!(
            self,
            Scenario::IndexSettingsPost | Scenario::IndexSettingsOptions
        )
    }
}

#[derive(Debug, Clone)]
pub struct ComplianceProbe {
    base_url: String,
    index_name: String,
    cleanup: bool,
}

impl ComplianceProbe {
    pub fn new(base_url: &str, index_name: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            index_name: index_name.to_string(),
            cleanup: true,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Result<Self, ProbeError> {
        config.validate()?;
        let mut probe = Self::new(&config.base_url, &config.resolve_index_name());
        probe.cleanup = config.cleanup;
        Ok(probe)
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn settings_path(&self) -> String {
        format!("/{}/_settings", self.index_name)
    }

    fn request(&self, method: HttpMethod, uri_path: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{uri_path}", self.base_url),
            uri_path: uri_path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_tasks_options(&self) -> HttpRequest {
        self.request(HttpMethod::Options, TASKS_PATH)
    }

    pub fn build_tasks_delete(&self) -> HttpRequest {
        self.request(HttpMethod::Delete, TASKS_PATH)
    }

    pub fn build_create_index(&self) -> HttpRequest {
        self.request(HttpMethod::Put, &format!("/{}", self.index_name))
    }

    pub fn build_index_settings_post(&self) -> HttpRequest {
        self.request(HttpMethod::Post, &self.settings_path())
    }

    pub fn build_index_settings_options(&self) -> HttpRequest {
        self.request(HttpMethod::Options, &self.settings_path())
    }

    pub fn build_delete_index(&self) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/{}", self.index_name))
    }

    pub fn check_tasks_options(
        &self,
        result: Result<HttpResponse, RequestError>,
    ) -> Result<(), ProbeError> {
        let response = expect_success(result)?;
        expect_status(&response, 200)?;
        expect_allow(&response, &AllowSet::from_methods([HttpMethod::Get]))
    }

    pub fn check_tasks_delete(
        &self,
        result: Result<HttpResponse, RequestError>,
    ) -> Result<(), ProbeError> {
        let response = expect_failure(result, METHOD_NOT_ALLOWED)?;
        expect_allow(&response, &AllowSet::from_methods([HttpMethod::Get]))?;
        expect_body_contains(
            &response,
            &format!(
                "Incorrect HTTP method for uri [{TASKS_PATH}] and method [{}], allowed: [GET]",
                HttpMethod::Delete
            ),
        )
    }

    /// Index creation succeeds, or the index is already there from an
    /// earlier scenario or run.
    pub fn check_create_index(
        &self,
        result: Result<HttpResponse, RequestError>,
    ) -> Result<(), ProbeError> {
        match result {
            Err(RequestError::Status(response))
                if response.status == 400 && response.body.contains(ALREADY_EXISTS) =>
            {
                tracing::debug!(index = %self.index_name, "index already exists");
                Ok(())
            }
            other => expect_success(other).map(|_| ()),
        }
    }

    pub fn check_index_settings_post(
        &self,
        result: Result<HttpResponse, RequestError>,
    ) -> Result<(), ProbeError> {
        let response = expect_failure(result, METHOD_NOT_ALLOWED)?;
        expect_allow(
            &response,
            &AllowSet::from_methods([HttpMethod::Put, HttpMethod::Get]),
        )?;
        expect_body_contains(
            &response,
            &format!(
                "Incorrect HTTP method for uri [{}] and method [{}], allowed:",
                self.settings_path(),
                HttpMethod::Post
            ),
        )?;
        expect_body_contains(&response, "GET")?;
        expect_body_contains(&response, "PUT")
    }

    pub fn check_index_settings_options(
        &self,
        result: Result<HttpResponse, RequestError>,
    ) -> Result<(), ProbeError> {
        let response = expect_success(result)?;
        expect_status(&response, 200)?;
        expect_allow(
            &response,
            &AllowSet::from_methods([HttpMethod::Get, HttpMethod::Put]),
        )
    }

    fn ensure_index<T: Transport>(&self, transport: &T) -> Result<(), ProbeError> {
        let request = self.build_create_index();
        self.check_create_index(transport.perform(&request))
            .map_err(|source| ProbeError::Setup {
                step: format!("{} {}", request.method, request.uri_path),
                source: Box::new(source),
            })
    }

    pub fn run_scenario<T: Transport>(
        &self,
        scenario: Scenario,
        transport: &T,
    ) -> Result<(), ProbeError> {
        if scenario.needs_index() {
            self.ensure_index(transport)?;
        }
        match scenario {
            Scenario::TasksOptions => {
                self.check_tasks_options(transport.perform(&self.build_tasks_options()))
            }
            Scenario::TasksUnsupportedMethod => {
                self.check_tasks_delete(transport.perform(&self.build_tasks_delete()))
            }
            Scenario::IndexSettingsPost => self
                .check_index_settings_post(transport.perform(&self.build_index_settings_post())),
            Scenario::IndexSettingsOptions => self.check_index_settings_options(
                transport.perform(&self.build_index_settings_options()),
            ),
        }
    }

    /// Run every scenario in order, then delete the index if cleanup is on.
    pub fn run<T: Transport>(&self, transport: &T) -> Report {
        self.run_scenarios(&Scenario::ALL, transport)
    }

    pub fn run_scenarios<T: Transport>(&self, scenarios: &[Scenario], transport: &T) -> Report {
        let mut report = Report::default();
        for &scenario in scenarios {
            tracing::info!(scenario = scenario.name(), "running scenario");
            let result = self.run_scenario(scenario, transport);
            match &result {
                Ok(()) => tracing::info!(scenario = scenario.name(), "passed"),
                Err(err) => tracing::info!(scenario = scenario.name(), error = %err, "failed"),
            }
            report.push(ScenarioOutcome { scenario, result });
        }
        if self.cleanup && scenarios.iter().any(Scenario::needs_index) {
            self.teardown(transport);
        }
        report
    }

    /// Best-effort index deletion; failures are logged and otherwise ignored.
    pub fn teardown<T: Transport>(&self, transport: &T) {
        match transport.perform(&self.build_delete_index()) {
            Ok(_) => tracing::info!(index = %self.index_name, "deleted index"),
            Err(err) => tracing::warn!(index = %self.index_name, error = %err, "failed to delete index"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    fn probe() -> ComplianceProbe {
        ComplianceProbe::new("http://localhost:9200", "testindex")
    }

    fn response(status: u16, allow: Option<&str>, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: allow
                .map(|v| vec![("Allow".to_string(), v.to_string())])
                .unwrap_or_default(),
            body: body.to_string(),
        }
    }

    fn rejected(status: u16, allow: &str, body: &str) -> Result<HttpResponse, RequestError> {
        Err(RequestError::Status(response(status, Some(allow), body)))
    }

    /// Replays canned results and records the requests it saw.
    struct Scripted {
        replies: RefCell<VecDeque<Result<HttpResponse, RequestError>>>,
        seen: RefCell<Vec<(HttpMethod, String)>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<HttpResponse, RequestError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for Scripted {
        fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
            self.seen
                .borrow_mut()
                .push((request.method, request.uri_path.clone()));
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(RequestError::Transport("no scripted reply".into())))
        }
    }

    #[test]
    fn builders_produce_expected_requests() {
        let p = probe();
        let req = p.build_tasks_options();
        assert_eq!(req.method, HttpMethod::Options);
        assert_eq!(req.path, "http://localhost:9200/_tasks");
        assert_eq!(req.uri_path, "/_tasks");
        assert!(req.body.is_none());

        assert_eq!(p.build_tasks_delete().method, HttpMethod::Delete);

        let req = p.build_create_index();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.uri_path, "/testindex");

        let req = p.build_index_settings_post();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:9200/testindex/_settings");

        assert_eq!(p.build_delete_index().uri_path, "/testindex");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let p = ComplianceProbe::new("http://localhost:9200/", "testindex");
        assert_eq!(p.build_tasks_options().path, "http://localhost:9200/_tasks");
    }

    #[test]
    fn tasks_options_passes_on_200_get() {
        assert!(probe()
            .check_tasks_options(Ok(response(200, Some("GET"), "")))
            .is_ok());
    }

    #[test]
    fn tasks_options_rejects_extra_methods() {
        let err = probe()
            .check_tasks_options(Ok(response(200, Some("GET,DELETE"), "")))
            .unwrap_err();
        assert!(matches!(err, ProbeError::AllowMismatch { .. }));
    }

    #[test]
    fn tasks_options_requires_allow_header() {
        let err = probe()
            .check_tasks_options(Ok(response(200, None, "")))
            .unwrap_err();
        assert!(matches!(err, ProbeError::MissingHeader(_)));
    }

    #[test]
    fn tasks_options_rejects_204() {
        let err = probe()
            .check_tasks_options(Ok(response(204, Some("GET"), "")))
            .unwrap_err();
        assert!(matches!(
            err,
            ProbeError::UnexpectedStatus {
                expected: 200,
                actual: 204
            }
        ));
    }

    #[test]
    fn tasks_delete_passes_on_compliant_405() {
        let body = r#"{"error":"Incorrect HTTP method for uri [/_tasks] and method [DELETE], allowed: [GET]","status":405}"#;
        assert!(probe()
            .check_tasks_delete(rejected(405, "GET", body))
            .is_ok());
    }

    #[test]
    fn tasks_delete_fails_when_request_succeeds() {
        let err = probe()
            .check_tasks_delete(Ok(response(200, None, "{}")))
            .unwrap_err();
        assert_eq!(err.to_string(), "Request should have failed with 405 error");
    }

    #[test]
    fn tasks_delete_requires_message() {
        let err = probe()
            .check_tasks_delete(rejected(405, "GET", ""))
            .unwrap_err();
        assert!(matches!(err, ProbeError::MissingBodyText { .. }));
    }

    #[test]
    fn settings_post_accepts_either_method_order() {
        let body = "Incorrect HTTP method for uri [/testindex/_settings] and method [POST], allowed: [PUT, GET]";
        assert!(probe()
            .check_index_settings_post(rejected(405, "PUT,GET", body))
            .is_ok());
        let body = "Incorrect HTTP method for uri [/testindex/_settings] and method [POST], allowed: [GET, PUT]";
        assert!(probe()
            .check_index_settings_post(rejected(405, "GET, PUT", body))
            .is_ok());
    }

    #[test]
    fn settings_post_requires_both_tokens_in_body() {
        let body = "Incorrect HTTP method for uri [/testindex/_settings] and method [POST], allowed: [GET]";
        let err = probe()
            .check_index_settings_post(rejected(405, "PUT,GET", body))
            .unwrap_err();
        assert!(matches!(err, ProbeError::MissingBodyText { needle, .. } if needle == "PUT"));
    }

    #[test]
    fn create_index_tolerates_existing_index() {
        let p = probe();
        assert!(p
            .check_create_index(Err(RequestError::Status(response(
                400,
                None,
                r#"{"error":{"type":"resource_already_exists_exception"}}"#,
            ))))
            .is_ok());
        assert!(p
            .check_create_index(Err(RequestError::Status(response(400, None, "bad"))))
            .is_err());
    }

    #[test]
    fn setup_failure_skips_probe_request() {
        let transport = Scripted::new(vec![Err(RequestError::Transport("refused".into()))]);
        let err = probe()
            .run_scenario(Scenario::IndexSettingsPost, &transport)
            .unwrap_err();
        assert!(matches!(err, ProbeError::Setup { ref step, .. } if step == "PUT /testindex"));
        assert_eq!(transport.seen.borrow().len(), 1);
    }

    #[test]
    fn rejected_setup_reports_server_reason() {
        let transport = Scripted::new(vec![Err(RequestError::Status(response(
            400,
            None,
            r#"{"error":{"type":"invalid_index_name_exception"}}"#,
        )))]);
        let err = ComplianceProbe::new("http://localhost:9200", "testindex")
            .run_scenario(Scenario::IndexSettingsOptions, &transport)
            .unwrap_err();
        let ProbeError::Setup { source, .. } = &err else {
            panic!("expected setup error, got {err:?}");
        };
        assert!(matches!(**source, ProbeError::Rejected { status: 400, .. }));
        assert!(err.to_string().contains("invalid_index_name_exception"));
    }

    #[test]
    fn run_executes_all_scenarios_then_teardown() {
        let settings_body = "Incorrect HTTP method for uri [/testindex/_settings] and method [POST], allowed: [GET, PUT]";
        let transport = Scripted::new(vec![
            Ok(response(200, Some("GET"), "")),
            rejected(
                405,
                "GET",
                "Incorrect HTTP method for uri [/_tasks] and method [DELETE], allowed: [GET]",
            ),
            Ok(response(200, None, r#"{"acknowledged":true}"#)),
            rejected(405, "GET,PUT", settings_body),
            rejected(400, "", "resource_already_exists_exception"),
            Ok(response(200, Some("GET,PUT"), "")),
            Ok(response(200, None, r#"{"acknowledged":true}"#)),
        ]);
        let report = probe().run(&transport);
        assert!(report.passed(), "{report}");
        assert_eq!(report.outcomes().len(), 4);

        let seen = transport.seen.borrow();
        assert_eq!(seen.len(), 7);
        assert_eq!(seen[0], (HttpMethod::Options, "/_tasks".to_string()));
        assert_eq!(seen[3], (HttpMethod::Post, "/testindex/_settings".to_string()));
        assert_eq!(seen[6], (HttpMethod::Delete, "/testindex".to_string()));
    }

    #[test]
    fn no_teardown_when_cleanup_disabled() {
        let config = ProbeConfig::new("http://localhost:9200")
            .with_index_name("testindex")
            .with_cleanup(false);
        let p = ComplianceProbe::from_config(&config).unwrap();
        let transport = Scripted::new(vec![
            Ok(response(200, None, "")),
            Ok(response(200, Some("GET,PUT"), "")),
        ]);
        let report = p.run_scenarios(&[Scenario::IndexSettingsOptions], &transport);
        assert!(report.passed());
        assert_eq!(transport.seen.borrow().len(), 2);
    }

    #[test]
    fn tasks_only_run_skips_teardown() {
        let transport = Scripted::new(vec![Ok(response(200, Some("GET"), ""))]);
        let report = probe().run_scenarios(&[Scenario::TasksOptions], &transport);
        assert!(report.passed());
        assert_eq!(transport.seen.borrow().len(), 1);
    }
}
