use anyhow::Result;
use clap::Parser;
use model_registry::config::{Cli, Commands, LogConfig, LogFormat};
use model_registry::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.logging);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                "Starting model registry on {}",
                cli.server.bind_addr()
            );
            server::start_server(&cli.server, &cli.database).await?;
        }
        Commands::Migrate { direction } => {
            server::migrate_database(&cli.database, direction).await?;
        }
    }

    Ok(())
}

fn setup_logging(config: &LogConfig) {
    let log_level = match config.log_level.to_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error") => level.to_string(),
        _ => "info".to_string(),
    };

    // RUST_LOG takes precedence over LOGGER_LEVEL.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlx=warn,{}", log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.json().with_current_span(true).init(),
        LogFormat::Text => builder.with_target(false).init(),
    }
}
