//! crmdesk - command line client for the CRM backend.
//!
//! Signs in, keeps the session token in a file or the OS keychain, and runs
//! the auth, client and invoice operations, printing responses as JSON.

mod cli;
mod commands;
mod config;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use crmdesk_core::auth::{FileTokenStore, KeyringTokenStore, TokenStore};
use crmdesk_core::{ApiClient, ClientConfig, Session, SessionEvent};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, StoreKind};

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

fn token_store(kind: StoreKind) -> Result<Arc<dyn TokenStore>> {
    Ok(match kind {
        StoreKind::File => Arc::new(FileTokenStore::default_location()?),
        StoreKind::Keyring => Arc::new(KeyringTokenStore::default()),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();
    debug!(command = cli.command.name(), "crmdesk starting");

    let mut config = ClientConfig::from_env().with_credentials(cli.with_credentials);
    if let Some(url) = cli.api_url {
        config = config.with_base_url(url);
    }

    let session = Session::new(token_store(cli.token_store)?);
    let mut events = session.subscribe();
    let client = ApiClient::new(config, session)?;

    let result = commands::run(&client, cli.command).await;

    // Concurrent 401s each emit an event; one hint is enough
    let mut invalidated = false;
    while let Ok(SessionEvent::Invalidated { login_path }) = events.try_recv() {
        info!(login_path = %login_path, "Session reset requested");
        invalidated = true;
    }
    if invalidated {
        eprintln!("Your session has expired. Run `crmdesk login` to sign in again.");
    }

    result
}
