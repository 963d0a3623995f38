//! # Elemental
//!
//! Runs a headless merge board session.
//!
//! ```text
//! elemental --macro "spawn Water 0 0; spawn Earth 2 0; tap 0 0; tap 2 0; merge"
//! elemental --script scripts/first_merges.json --frames 600
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use elemental_engine::{app, RunOptions};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("elemental=info".parse()?))
        .init();

    info!("Elemental starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let options = RunOptions::from_args(std::env::args().skip(1))?;
    app::run(&options)?;

    info!("Elemental shutdown complete");
    Ok(())
}
