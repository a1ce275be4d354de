pub mod cli;
pub mod client;
pub mod config;
pub mod core_state;
pub mod input;
pub mod models;
pub mod proxy;
pub mod render;
pub mod storage;
pub mod stores;
pub mod tutorial;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub async fn run() -> ExitCode {
    // A missing .env is normal.
    let dotenv = dotenvy::dotenv();

    // Initialize tracing (stderr, so stdout stays clean for results)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    tracing::debug!("clindiag starting v{}", config::APP_VERSION);

    let cli = cli::Cli::parse();
    match cli::execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
