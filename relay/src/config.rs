use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use url::Url;

/// Environment variable holding the bearer credential for upstream calls.
pub const UPSTREAM_TOKEN_VAR: &str = "UPSTREAM_API_TOKEN";
/// Environment variable holding the shared secret required from clients.
pub const SHARED_SECRET_VAR: &str = "RELAY_SHARED_SECRET";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("port cannot be 0")]
    InvalidPort,

    #[error("upstream timeout cannot be 0")]
    InvalidTimeout,

    #[error("auth header name is invalid or empty")]
    InvalidAuthHeader,

    #[error("record property mapping for '{0}' is empty")]
    EmptyPropertyName(&'static str),

    #[error("UPSTREAM_API_TOKEN is not set; refusing to start without an upstream credential")]
    MissingUpstreamToken,

    #[error("upstream credential contains characters not valid in a header value")]
    InvalidCredential,

    #[error("upstream version header is invalid")]
    InvalidVersionHeader,

    #[error("could not construct upstream client: {0}")]
    ClientError(#[from] reqwest::Error),
}

/// Relay configuration, loaded once at startup and immutable afterwards.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for incoming requests
    #[serde(default)]
    pub listener: Listener,
    /// The document-database API this relay fronts
    pub upstream: UpstreamConfig,
    /// Client-facing authentication settings
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logical record field -> upstream property name mapping
    ///
    /// Note: property names vary per target collection schema, so they
    /// are deployment configuration rather than code.
    #[serde(default)]
    pub record_properties: PropertyMap,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the relay configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listener.validate()?;
        self.upstream.validate()?;

        if self.auth.header.trim().is_empty() {
            return Err(ConfigError::InvalidAuthHeader);
        }

        self.record_properties.validate()?;
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upstream API connection settings
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API, may carry a path prefix (e.g. "/v1")
    ///
    /// Note: Uses the `url::Url` type so invalid URLs are rejected
    /// during config deserialization.
    pub base_url: Url,
    /// Name of the fixed API-version header sent on every call
    #[serde(default = "default_version_header")]
    pub version_header: String,
    /// Value of the API-version header
    #[serde(default = "default_version")]
    pub version: String,
    /// Outbound call timeout in seconds; no handler may block past this
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.version_header.trim().is_empty() || self.version.trim().is_empty() {
            return Err(ConfigError::InvalidVersionHeader);
        }
        Ok(())
    }
}

/// Client-facing authentication settings
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// Header clients must send the shared secret in
    #[serde(default = "default_auth_header")]
    pub header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            header: default_auth_header(),
        }
    }
}

/// Maps the logical fields of a simplified record to the property names
/// of the target upstream collection.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PropertyMap {
    #[serde(default = "default_term_property")]
    pub term: String,
    #[serde(default = "default_definition_property")]
    pub definition: String,
    #[serde(default = "default_category_property")]
    pub category: String,
    #[serde(default = "default_synonyms_property")]
    pub synonyms: String,
}

impl PropertyMap {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, name) in [
            ("term", &self.term),
            ("definition", &self.definition),
            ("category", &self.category),
            ("synonyms", &self.synonyms),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyPropertyName(field));
            }
        }
        Ok(())
    }
}

impl Default for PropertyMap {
    fn default() -> Self {
        PropertyMap {
            term: default_term_property(),
            definition: default_definition_property(),
            category: default_category_property(),
            synonyms: default_synonyms_property(),
        }
    }
}

/// Secrets are read from the process environment, never from the config
/// file, so deployment descriptors can stay checked in.
#[derive(Clone, Debug)]
pub struct Secrets {
    /// Bearer credential attached to every upstream call. Required.
    pub upstream_token: String,
    /// Shared secret required from relay clients. When absent the gate
    /// is disabled and the relay runs open.
    pub shared_secret: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let upstream_token = get(UPSTREAM_TOKEN_VAR)
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingUpstreamToken)?;
        let shared_secret = get(SHARED_SECRET_VAR).filter(|secret| !secret.is_empty());
        Ok(Secrets {
            upstream_token,
            shared_secret,
        })
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_version_header() -> String {
    "Notion-Version".to_string()
}

fn default_version() -> String {
    "2022-06-28".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_auth_header() -> String {
    "x-relay-key".to_string()
}

fn default_term_property() -> String {
    "Term".to_string()
}

fn default_definition_property() -> String {
    "Definition".to_string()
}

fn default_category_property() -> String {
    "Category".to_string()
}

fn default_synonyms_property() -> String {
    "Synonyms".to_string()
}
