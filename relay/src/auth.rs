use crate::api::AppState;
use crate::errors::RelayError;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// Gatekeeper middleware. Every protected route passes through here
/// before its handler runs; `/health` is mounted outside this layer.
///
/// With no shared secret configured the gate allows everything. That
/// degraded mode is announced once at startup, not per request.
pub async fn require_shared_secret(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, RelayError> {
    let Some(expected) = state.shared_secret.as_deref() else {
        return Ok(next.run(request).await);
    };

    // HeaderMap lookups are case-insensitive per standard HTTP semantics.
    match request.headers().get(&state.auth_header) {
        None => {
            tracing::warn!(
                header = %state.auth_header,
                path = %request.uri().path(),
                "rejected request: missing credential header"
            );
            Err(RelayError::MissingCredential(
                state.auth_header.as_str().to_string(),
            ))
        }
        Some(supplied) if supplied.as_bytes() == expected.as_bytes() => {
            tracing::debug!(path = %request.uri().path(), "credential accepted");
            Ok(next.run(request).await)
        }
        Some(_) => {
            tracing::warn!(
                header = %state.auth_header,
                path = %request.uri().path(),
                "rejected request: credential mismatch"
            );
            Err(RelayError::Forbidden)
        }
    }
}
