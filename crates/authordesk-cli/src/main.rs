//! authordesk - a terminal front-end for the authors admin API.
//!
//! Log in once, then view the operator profile and list, add, edit or
//! delete authors. The session is kept in the cache directory and refreshed
//! transparently when the access token expires.

mod app;
mod cli;
mod render;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use cli::Cli;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();
    info!(command = ?cli.command, "authordesk starting");

    let mut app = App::new(cli.base_url)?;
    app.run(cli.command).await
}
