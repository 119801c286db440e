use clap::Parser;
use relay::config::{Config, Secrets};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Authenticating relay in front of a document-database API.
#[derive(Parser)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    let secrets = Secrets::from_env()?;

    relay::run(config, secrets).await?;
    Ok(())
}
