use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

/// The normalized failure shape. Every error a client sees, whatever
/// its origin, is serialized as this envelope.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub details: String,
    pub status: u16,
}

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("missing credential header: {0}")]
    MissingCredential(String),

    #[error("credential rejected")]
    Forbidden,

    #[error("upstream error ({status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    fn envelope(&self) -> ErrorEnvelope {
        match self {
            RelayError::Validation(details) => ErrorEnvelope {
                error: "Bad Request".to_string(),
                details: details.clone(),
                status: 400,
            },
            RelayError::MissingCredential(header) => ErrorEnvelope {
                error: "Unauthorized".to_string(),
                details: format!("Missing {header} header."),
                status: 401,
            },
            RelayError::Forbidden => ErrorEnvelope {
                error: "Forbidden".to_string(),
                details: "Invalid credential.".to_string(),
                status: 403,
            },
            RelayError::Upstream {
                status,
                message,
                code,
            } => {
                let details = match code {
                    Some(code) => format!("{message} (Upstream Code: {code})"),
                    None => message.clone(),
                };
                ErrorEnvelope {
                    error: "Upstream API Error".to_string(),
                    details,
                    status: *status,
                }
            }
            // Internal detail stays in the logs; clients get a fixed message.
            RelayError::Internal(_) => ErrorEnvelope {
                error: "Internal Server Error".to_string(),
                details: "An unexpected error occurred.".to_string(),
                status: 500,
            },
        }
    }
}

/// The terminal normalizer: every handler and gatekeeper failure is
/// funneled through here. Envelope construction is infallible.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Upstream { .. } | RelayError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
            }
            _ => {
                tracing::warn!(error = %self, "request rejected");
            }
        }

        let envelope = self.envelope();
        let status =
            StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let envelope = RelayError::Validation("Missing required fields: Term".to_string())
            .envelope();
        assert_eq!(envelope.error, "Bad Request");
        assert_eq!(envelope.status, 400);
        assert!(envelope.details.contains("Term"));
    }

    #[test]
    fn missing_credential_names_the_header() {
        let envelope = RelayError::MissingCredential("x-relay-key".to_string()).envelope();
        assert_eq!(envelope.error, "Unauthorized");
        assert_eq!(envelope.status, 401);
        assert!(envelope.details.contains("x-relay-key"));
    }

    #[test]
    fn forbidden_maps_to_403() {
        let envelope = RelayError::Forbidden.envelope();
        assert_eq!(envelope.error, "Forbidden");
        assert_eq!(envelope.status, 403);
    }

    #[test]
    fn upstream_error_appends_code_when_present() {
        let envelope = RelayError::Upstream {
            status: 404,
            message: "not found".to_string(),
            code: Some("object_not_found".to_string()),
        }
        .envelope();
        assert_eq!(envelope.error, "Upstream API Error");
        assert_eq!(envelope.status, 404);
        assert_eq!(envelope.details, "not found (Upstream Code: object_not_found)");
    }

    #[test]
    fn upstream_error_without_code_is_message_only() {
        let envelope = RelayError::Upstream {
            status: 500,
            message: "upstream request timed out".to_string(),
            code: None,
        }
        .envelope();
        assert_eq!(envelope.details, "upstream request timed out");
    }

    #[test]
    fn internal_error_never_leaks_detail() {
        let envelope = RelayError::Internal("secret stack trace".to_string()).envelope();
        assert_eq!(envelope.error, "Internal Server Error");
        assert_eq!(envelope.details, "An unexpected error occurred.");
        assert_eq!(envelope.status, 500);
    }

    #[test]
    fn response_status_mirrors_envelope() {
        let response = RelayError::Upstream {
            status: 429,
            message: "rate limited".to_string(),
            code: None,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
