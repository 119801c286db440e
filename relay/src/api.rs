use crate::auth;
use crate::config::{Config, ConfigError, PropertyMap, Secrets};
use crate::errors::RelayError;
use crate::record::SimplifiedRecord;
use crate::upstream::{UpstreamClient, UpstreamResponse};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http::HeaderName;
use http::header::CONTENT_TYPE;
use serde_json::{Value, json};
use std::sync::Arc;

/// Read-only per-process state, shared by reference across requests.
pub struct AppState {
    pub auth_header: HeaderName,
    pub shared_secret: Option<String>,
    pub upstream: UpstreamClient,
    pub properties: PropertyMap,
}

impl AppState {
    pub fn new(config: &Config, secrets: &Secrets) -> Result<Self, ConfigError> {
        let auth_header = HeaderName::from_bytes(config.auth.header.as_bytes())
            .map_err(|_| ConfigError::InvalidAuthHeader)?;
        let upstream = UpstreamClient::new(&config.upstream, &secrets.upstream_token)?;

        Ok(AppState {
            auth_header,
            shared_secret: secrets.shared_secret.clone(),
            upstream,
            properties: config.record_properties.clone(),
        })
    }
}

/// Builds the relay's route table. The liveness probe is mounted
/// outside the gatekeeper layer; everything else sits behind it.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/blocks/{id}/children", get(block_children))
        .route("/query-database/{id}", post(query_database))
        .route("/insert-record/{id}", post(insert_record))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_shared_secret,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

/// Liveness probe. Unauthenticated on purpose.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn block_children(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, RelayError> {
    let block_id = require_id(&id, "block id")?;
    let upstream = state.upstream.block_children(block_id).await?;
    Ok(relay_response(upstream))
}

async fn query_database(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let database_id = require_id(&id, "database id")?;

    let parsed: Value = serde_json::from_slice(&body).map_err(|_| {
        RelayError::Validation("Request body must be a non-empty JSON object.".to_string())
    })?;
    match parsed.as_object() {
        Some(query) if !query.is_empty() => {}
        _ => {
            return Err(RelayError::Validation(
                "Request body must be a non-empty JSON object.".to_string(),
            ));
        }
    }

    // The query itself is opaque to the relay; the raw bytes go through.
    let upstream = state.upstream.query_database(database_id, body).await?;
    Ok(relay_response(upstream))
}

async fn insert_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let database_id = require_id(&id, "database id")?;

    let parsed: Value = serde_json::from_slice(&body)
        .map_err(|_| RelayError::Validation("Request body must be a JSON object.".to_string()))?;
    let record = SimplifiedRecord::from_body(&parsed)?;
    let payload = record.to_page_payload(database_id, &state.properties);

    let upstream = state.upstream.create_page(&payload).await?;
    Ok(relay_response(upstream))
}

fn require_id<'a>(raw: &'a str, what: &str) -> Result<&'a str, RelayError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(RelayError::Validation(format!("Missing {what} in path.")));
    }
    Ok(id)
}

/// Success payloads pass through untouched: same status, same bytes.
fn relay_response(upstream: UpstreamResponse) -> Response {
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}
