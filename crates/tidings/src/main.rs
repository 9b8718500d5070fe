// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tidings - a news processing pipeline and RAG dialogue engine.
//!
//! This is the binary entry point for the Tidings service.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod serve;

/// Tidings - a news processing pipeline and RAG dialogue engine.
#[derive(Parser, Debug)]
#[command(name = "tidings", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Tidings HTTP service.
    Serve {
        /// Explicit config file path (default: XDG hierarchy).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate the effective configuration and exit.
    ConfigCheck {
        /// Explicit config file path (default: XDG hierarchy).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => match serve::run_serve(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::ConfigCheck { config } => match serve::check_config(config) {
            Ok(()) => {
                println!("configuration ok");
                ExitCode::SUCCESS
            }
            Err(messages) => {
                for message in messages {
                    eprintln!("config error: {message}");
                }
                ExitCode::FAILURE
            }
        },
    }
}
