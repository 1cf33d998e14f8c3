mod config;
mod http;
mod logger;
#[cfg(feature = "metrics")]
mod metrics;
mod signal;
mod state;
mod store;

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::Config;
use crate::state::State;
use crate::store::Store;

#[derive(Debug, Parser)]
#[command(version, about = "The fairway tournament server")]
struct Args {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let config = match Config::from_file(&args.config).await {
        Ok(config) => config,
        Err(err) => {
            // The logger is not installed yet at this point.
            eprintln!(
                "Failed to read {}: {}, falling back to default config",
                args.config.display(),
                err
            );

            Config::default()
        }
    }
    .with_environment();

    logger::init(config.loglevel);
    log::info!("Using config: {:?}", config);

    let store = Store::new(store::seed());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::task::spawn(async move {
        signal::wait().await;
        log::info!("Shutting down");
        let _ = shutdown_tx.send(true);
    });

    let state = State::new(config.clone(), store, shutdown_rx);

    // A failure to bind is fatal, there is no fallback port and no retry.
    http::bind(config.bind, state).await?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
    #[error("bad request")]
    BadRequest,
    #[error("method not allowed")]
    MethodNotAllowed,
}
