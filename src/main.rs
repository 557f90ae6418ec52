//! Main entry point for RustyEdit.
//!
//! Usage: `rusty-edit [FILE]...`. Each file opens in its own tab; a missing
//! file starts empty and is created on first save.

use std::path::PathBuf;

use anyhow::Result;
use rusty_edit::config::Config;
use rusty_edit::utils;
use rusty_edit::App;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging before anything else
    let _log_guard = utils::logger::init_logging();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    let config = Config::load()?;
    tracing::info!(
        "Starting with {} file(s), backend {} model {} (stream: {})",
        paths.len(),
        config.base_url,
        config.model,
        config.stream
    );

    let mut app = App::new(&config, &paths)?;
    app.run().await
}
