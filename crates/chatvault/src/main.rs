// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatvault - durable chat history archiver.
//!
//! Binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod serve;
mod shutdown;

/// Chatvault - durable chat history archiver.
#[derive(Parser, Debug)]
#[command(name = "chatvault", version, about, long_about = None)]
struct Cli {
    /// Path to an explicit config file (overrides the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the archiver: task queue, missed-check timer, and HTTP/WS API.
    Serve,
    /// Print archive statistics and exit.
    Stats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => chatvault_config::load_and_validate_path(path),
        None => chatvault_config::load_and_validate(),
    };
    let config = match config {
        Ok(config) => config,
        Err(errors) => {
            chatvault_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) | None => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Stats) => {
            if let Err(e) = serve::run_stats(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
    }
}
