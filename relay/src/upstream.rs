use crate::config::{ConfigError, UpstreamConfig};
use crate::errors::RelayError;
use bytes::Bytes;
use http::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// An opaque upstream reply. The relay never parses or mutates success
/// payloads; they are handed back to the client as-is.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Outbound client for the document-database API.
///
/// Every call carries the bearer credential and the fixed API-version
/// header, and is bounded by the configured timeout. There are no
/// retries: a failed call surfaces immediately.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, token: &str) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();

        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ConfigError::InvalidCredential)?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let version_header = HeaderName::from_bytes(config.version_header.as_bytes())
            .map_err(|_| ConfigError::InvalidVersionHeader)?;
        let version = HeaderValue::from_str(&config.version)
            .map_err(|_| ConfigError::InvalidVersionHeader)?;
        headers.insert(version_header, version);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(UpstreamClient {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Lists the child nodes of a block.
    pub async fn block_children(&self, block_id: &str) -> Result<UpstreamResponse, RelayError> {
        let url = self.endpoint(&["blocks", block_id, "children"])?;
        self.send(self.http.get(url)).await
    }

    /// Runs a query against a database. The caller's query body is
    /// forwarded byte-for-byte, never re-serialized.
    pub async fn query_database(
        &self,
        database_id: &str,
        query: Bytes,
    ) -> Result<UpstreamResponse, RelayError> {
        let url = self.endpoint(&["databases", database_id, "query"])?;
        self.send(
            self.http
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(query),
        )
        .await
    }

    /// Creates a page from a prepared page-creation payload.
    pub async fn create_page(&self, payload: &Value) -> Result<UpstreamResponse, RelayError> {
        let url = self.endpoint(&["pages"])?;
        self.send(self.http.post(url).json(payload)).await
    }

    /// Appends path segments to the base URL with per-segment encoding,
    /// so identifiers cannot smuggle extra path components.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RelayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::Internal("upstream base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<UpstreamResponse, RelayError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if status.is_success() {
            Ok(UpstreamResponse { status, body })
        } else {
            Err(failure_from_body(status, &body))
        }
    }
}

/// Transport-level failures (timeouts, refused connections) carry no
/// upstream status to mirror; they surface as 500 upstream errors.
fn transport_error(err: reqwest::Error) -> RelayError {
    let message = if err.is_timeout() {
        "upstream request timed out".to_string()
    } else {
        err.to_string()
    };
    tracing::error!(error = %err, "upstream transport failure");
    RelayError::Upstream {
        status: 500,
        message,
        code: None,
    }
}

/// Extracts the human message and optional error code from an upstream
/// rejection body, falling back to the status reason when the body is
/// not the expected JSON shape.
fn failure_from_body(status: StatusCode, body: &[u8]) -> RelayError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|value| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("upstream request failed")
                .to_string()
        });
    let code = parsed
        .as_ref()
        .and_then(|value| value.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);

    RelayError::Upstream {
        status: status.as_u16(),
        message,
        code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> UpstreamClient {
        let config = UpstreamConfig {
            base_url: base_url.parse().unwrap(),
            version_header: "Notion-Version".to_string(),
            version: "2022-06-28".to_string(),
            timeout_secs: 10,
        };
        UpstreamClient::new(&config, "test-token").expect("build client")
    }

    #[test]
    fn endpoint_preserves_base_path_prefix() {
        let client = test_client("https://api.notion.com/v1");
        let url = client.endpoint(&["blocks", "abc", "children"]).unwrap();
        assert_eq!(url.as_str(), "https://api.notion.com/v1/blocks/abc/children");
    }

    #[test]
    fn endpoint_handles_trailing_slash() {
        let client = test_client("https://api.notion.com/v1/");
        let url = client.endpoint(&["pages"]).unwrap();
        assert_eq!(url.as_str(), "https://api.notion.com/v1/pages");
    }

    #[test]
    fn endpoint_encodes_identifier_segments() {
        let client = test_client("https://api.notion.com/v1");
        let url = client.endpoint(&["blocks", "a/b c", "children"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.notion.com/v1/blocks/a%2Fb%20c/children"
        );
    }

    #[test]
    fn failure_body_yields_message_and_code() {
        let body = br#"{"message": "not found", "code": "object_not_found"}"#;
        let err = failure_from_body(StatusCode::NOT_FOUND, body);
        match err {
            RelayError::Upstream {
                status,
                message,
                code,
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "not found");
                assert_eq!(code.as_deref(), Some("object_not_found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_json_failure_body_falls_back_to_status_reason() {
        let err = failure_from_body(StatusCode::BAD_GATEWAY, b"<html>oops</html>");
        match err {
            RelayError::Upstream {
                status,
                message,
                code,
            } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
                assert!(code.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_credential_is_a_config_error() {
        let config = UpstreamConfig {
            base_url: "https://api.notion.com/v1".parse().unwrap(),
            version_header: "Notion-Version".to_string(),
            version: "2022-06-28".to_string(),
            timeout_secs: 10,
        };
        let result = UpstreamClient::new(&config, "bad\ntoken");
        assert!(matches!(result, Err(ConfigError::InvalidCredential)));
    }
}
