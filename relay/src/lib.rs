pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod record;
pub mod upstream;

use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Binds the listener and serves the relay until the process exits.
pub async fn run(config: config::Config, secrets: config::Secrets) -> Result<(), RunError> {
    let state = Arc::new(api::AppState::new(&config, &secrets)?);

    if state.shared_secret.is_none() {
        tracing::warn!(
            "no shared secret configured; the relay accepts unauthenticated requests"
        );
    }

    let app = api::router(state);
    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, upstream = %config.upstream.base_url, "relay listening");

    axum::serve(listener, app).await?;
    Ok(())
}
