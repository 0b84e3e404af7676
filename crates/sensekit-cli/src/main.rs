//! # sensekit
//!
//! Streams records from simulated sensors to stdout.
//!
//! ## Running
//!
//! ```bash
//! # Two sensors, JSON output, for ten seconds
//! sensekit --kind accelerometer --kind bluetooth --format json --duration-ms 10000
//!
//! # Show the effective configuration
//! sensekit --print-config
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use clap::Parser;
use sensekit_cli::args::Args;
use sensekit_cli::{app, logging};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let session = app::load_session(&args)?;
    logging::init(args.production, &session.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting sensekit");

    app::run(args, session).await
}
