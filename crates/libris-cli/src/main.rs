//! Libris - a command-line client for a library-management REST API.
//!
//! Signs in against the backend, keeps the session between runs, and exposes
//! the book catalog, categories, users and loans as subcommands.

mod commands;
mod render;

use std::io;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use libris_core::config::{Config, API_URL_ENV};
use libris_core::{ApiClient, SessionStore};

use commands::{Command, Context};

// ============================================================================
// Constants
// ============================================================================

/// Directory for daily rolling log files; logging to file is off when unset
const LOG_DIR_ENV: &str = "LIBRIS_LOG_DIR";

const LOG_FILE_PREFIX: &str = "libris.log";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the library API, including the `/api` prefix.
    #[arg(long, env = API_URL_ENV)]
    api_url: Option<String>,

    /// Print raw JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must outlive `main`'s work.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }
    debug!(api = %config.api_base_url, storage = %config.storage, "Loaded config");

    let client = ApiClient::from_config(&config)?;
    let mut session = SessionStore::new(config.open_storage()?, client.clone());
    session.restore();

    let mut ctx = Context {
        config,
        client,
        session,
        json: args.json,
    };
    args.command.execute(&mut ctx).await
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    info!("Libris starting");

    if let Err(e) = run(Args::parse()).await {
        error!(error = %format!("{:#}", e), "Command failed");
        eprintln!("Error: {}", render::error_message(&e));
        process::exit(1);
    }
}
