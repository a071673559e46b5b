//! wault - terminal host for the wault client library.
//!
//! Runs one resource API command, signing in through the authority's frame
//! first when no session is stored. The frame URL is printed and the frame's
//! messages are read from stdin.

mod commands;
mod host;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wault_core::config::{self, ClientConfig};
use wault_core::{FileSessionStore, KeyringSessionStore, MessageBus, SessionStore, WaultClient};

use commands::Command;
use host::TerminalFrameHost;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "wault.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and to a daily file under the cache directory. Use the
/// RUST_LOG env var to control the level (e.g., RUST_LOG=debug).
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file = config::cache_dir().ok().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
        tracing_appender::non_blocking(appender)
    });
    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

fn session_store() -> Result<Arc<dyn SessionStore>> {
    match std::env::var("WAULT_SESSION_STORE").as_deref() {
        Ok("keyring") => Ok(Arc::new(KeyringSessionStore)),
        _ => {
            let dir = config::cache_dir()?;
            Ok(Arc::new(FileSessionStore::new(dir)?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = match (&command, ClientConfig::load()?) {
        (Command::SaveConfig, _) | (_, None) => {
            ClientConfig::from_env().context("WAULT_* environment incomplete")?
        }
        (_, Some(config)) => config,
    };
    info!(authority = %config.authority_base_url, "wault starting");

    let bus = MessageBus::new();
    let client = WaultClient::new(config, session_store()?, Arc::new(TerminalFrameHost), bus.clone())?;

    std::thread::spawn(move || host::pump_stdin(bus));

    commands::run(&client, command).await
}
