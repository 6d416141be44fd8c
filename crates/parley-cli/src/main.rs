//! Parley command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Room id and key for a pair
//! parley derive-key alice bob
//!
//! # Encrypt in the browser-compatible format
//! parley encrypt alice bob "Hello"
//!
//! # Decrypt a stored field; exit status 1 on a sentinel
//! parley decrypt alice bob U2FsdGVkX18BAgMEBQYHCKDykrQd4KdJVwokg4TsRT4=
//!
//! # Move a field from (alice, bob) to (alice, carol)
//! parley reencrypt alice bob alice carol U2FsdGVk... --format sealed
//! ```

use std::{
    io::{self, Write},
    process::ExitCode,
};

use clap::Parser;
use parley_cli::{Cli, execute};
use parley_crypto::NONCE_SIZE;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // Logs go to stderr so stdout carries only the result
    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let mut random = [0u8; NONCE_SIZE];
    getrandom::fill(&mut random).map_err(|e| format!("OS RNG failure: {e}"))?;

    let report = execute(&cli.command, random)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", report.output)?;

    Ok(if report.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
