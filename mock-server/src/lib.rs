//! Stub search server reproducing the REST method-dispatch contract.
//!
//! Every route declares the methods it serves. `OPTIONS` answers 200 with an
//! `Allow` header built from that list, and any other undeclared method gets
//! a 405 carrying the same `Allow` header plus an explanatory JSON body.
//! Index state lives in memory only.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, put, MethodRouter},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

pub const TASKS_METHODS: &[Method] = &[Method::GET];
pub const INDEX_METHODS: &[Method] = &[Method::PUT, Method::GET, Method::DELETE];
pub const SETTINGS_METHODS: &[Method] = &[Method::GET, Method::PUT];

#[derive(Clone, Debug, PartialEq)]
pub struct Index {
    pub settings: Map<String, Value>,
}

impl Default for Index {
    fn default() -> Self {
        let mut settings = Map::new();
        settings.insert("number_of_shards".into(), Value::String("1".into()));
        settings.insert("number_of_replicas".into(), Value::String("1".into()));
        Self { settings }
    }
}

pub type Db = Arc<RwLock<HashMap<String, Index>>>;

pub fn app() -> Router {
    let db: Db = Arc::default();
    Router::new()
        .route("/_tasks", endpoint(TASKS_METHODS, get(list_tasks)))
        .route(
            "/{index}",
            endpoint(
                INDEX_METHODS,
                put(create_index).get(get_index).delete(delete_index),
            ),
        )
        .route(
            "/{index}/_settings",
            endpoint(SETTINGS_METHODS, get(get_settings).put(put_settings)),
        )
        .fallback(no_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Attach uniform `OPTIONS` and method-not-allowed handling to a route.
///
/// `get` also answers HEAD, so HEAD is rejected explicitly unless declared.
fn endpoint(allowed: &'static [Method], methods: MethodRouter<Db>) -> MethodRouter<Db> {
    let methods = if allowed.contains(&Method::HEAD) {
        methods
    } else {
        methods.head(move |uri: Uri| async move {
            method_not_allowed(allowed, &Method::HEAD, uri.path())
        })
    };
    methods
        .options(move || async move { options_response(allowed) })
        .fallback(move |method: Method, uri: Uri| async move {
            method_not_allowed(allowed, &method, uri.path())
        })
}

pub fn allow_header(allowed: &[Method]) -> String {
    allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn options_response(allowed: &[Method]) -> Response {
    (StatusCode::OK, [(header::ALLOW, allow_header(allowed))]).into_response()
}

fn method_not_allowed(allowed: &[Method], method: &Method, path: &str) -> Response {
    let listed = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let message =
        format!("Incorrect HTTP method for uri [{path}] and method [{method}], allowed: [{listed}]");
    tracing::debug!(%method, path, "method not allowed");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, allow_header(allowed))],
        Json(json!({ "error": message, "status": 405 })),
    )
        .into_response()
}

async fn no_handler(method: Method, uri: Uri) -> Response {
    let message = format!(
        "no handler found for uri [{}] and method [{method}]",
        uri.path()
    );
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message, "status": 400 })),
    )
        .into_response()
}

/// Structured error body in the `{"error":{...},"status":N}` shape.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    reason: String,
    index: Option<String>,
}

impl ApiError {
    fn index_not_found(index: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "index_not_found_exception",
            reason: format!("no such index [{index}]"),
            index: Some(index.to_string()),
        }
    }

    fn already_exists(index: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "resource_already_exists_exception",
            reason: format!("index [{index}] already exists"),
            index: Some(index.to_string()),
        }
    }

    fn invalid_name(index: &str, why: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_index_name_exception",
            reason: format!("Invalid index name [{index}], {why}"),
            index: Some(index.to_string()),
        }
    }

    fn parse(reason: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "parse_exception",
            reason,
            index: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut cause = json!({ "type": self.kind, "reason": self.reason });
        if let Some(index) = self.index {
            cause["index"] = Value::String(index);
        }
        let body = json!({
            "error": {
                "root_cause": [cause.clone()],
                "type": cause["type"],
                "reason": cause["reason"],
            },
            "status": self.status.as_u16(),
        });
        (self.status, Json(body)).into_response()
    }
}

pub fn validate_index_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(ApiError::invalid_name(name, "must not be empty, '.' or '..'"));
    }
    if name.starts_with(['_', '-', '+']) {
        return Err(ApiError::invalid_name(name, "must not start with '_', '-', or '+'"));
    }
    if name.chars().any(|c| c.is_uppercase()) {
        return Err(ApiError::invalid_name(name, "must be lowercase"));
    }
    if name
        .chars()
        .any(|c| matches!(c, '\\' | '/' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' | ',' | '#' | ':'))
    {
        return Err(ApiError::invalid_name(name, "contains a forbidden character"));
    }
    Ok(())
}

fn parse_body(body: &Bytes) -> Result<Option<Map<String, Value>>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(ApiError::parse("request body must be a JSON object".into())),
        Err(e) => Err(ApiError::parse(format!("failed to parse request body: {e}"))),
    }
}

/// Merge `{"settings":{..}}`, `{"index":{..}}` or flat `index.*` keys into
/// the stored settings. Scalars are stored as strings.
pub fn merge_settings(target: &mut Map<String, Value>, mut source: Map<String, Value>) {
    if let Some(Value::Object(inner)) = source.remove("settings") {
        source = inner;
    }
    if let Some(Value::Object(inner)) = source.remove("index") {
        source.extend(inner);
    }
    for (key, value) in source {
        let key = key.strip_prefix("index.").unwrap_or(&key).to_string();
        let value = match value {
            Value::String(_) | Value::Object(_) | Value::Array(_) | Value::Null => value,
            other => Value::String(other.to_string()),
        };
        target.insert(key, value);
    }
}

fn keyed_by_index(index: String, value: Value) -> Json<Value> {
    let mut body = Map::new();
    body.insert(index, value);
    Json(Value::Object(body))
}

async fn list_tasks() -> Json<Value> {
    Json(json!({ "nodes": {} }))
}

async fn create_index(
    State(db): State<Db>,
    Path(index): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    validate_index_name(&index)?;
    let mut entry = Index::default();
    if let Some(map) = parse_body(&body)? {
        merge_settings(&mut entry.settings, map);
    }
    let mut indices = db.write().await;
    if indices.contains_key(&index) {
        return Err(ApiError::already_exists(&index));
    }
    indices.insert(index.clone(), entry);
    tracing::info!(%index, "created index");
    Ok(Json(json!({
        "acknowledged": true,
        "shards_acknowledged": true,
        "index": index,
    })))
}

async fn get_index(
    State(db): State<Db>,
    Path(index): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let indices = db.read().await;
    let entry = indices
        .get(&index)
        .ok_or_else(|| ApiError::index_not_found(&index))?;
    Ok(keyed_by_index(
        index.clone(),
        json!({
            "aliases": {},
            "mappings": {},
            "settings": { "index": entry.settings },
        }),
    ))
}

async fn delete_index(
    State(db): State<Db>,
    Path(index): Path<String>,
) -> Result<Json<Value>, ApiError> {
    db.write()
        .await
        .remove(&index)
        .ok_or_else(|| ApiError::index_not_found(&index))?;
    tracing::info!(%index, "deleted index");
    Ok(Json(json!({ "acknowledged": true })))
}

async fn get_settings(
    State(db): State<Db>,
    Path(index): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let indices = db.read().await;
    let entry = indices
        .get(&index)
        .ok_or_else(|| ApiError::index_not_found(&index))?;
    Ok(keyed_by_index(
        index.clone(),
        json!({ "settings": { "index": entry.settings } }),
    ))
}

async fn put_settings(
    State(db): State<Db>,
    Path(index): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let map = parse_body(&body)?.ok_or_else(|| ApiError::parse("request body is required".into()))?;
    let mut indices = db.write().await;
    let entry = indices
        .get_mut(&index)
        .ok_or_else(|| ApiError::index_not_found(&index))?;
    merge_settings(&mut entry.settings, map);
    Ok(Json(json!({ "acknowledged": true })))
}
