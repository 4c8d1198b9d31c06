//! Command-line interface for strictly_turns.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Turns - co-signed, notarised tic-tac-toe
#[derive(Parser, Debug)]
#[command(name = "strictly_turns")]
#[command(about = "Two-party tic-tac-toe with notarised moves", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host the configured parties behind the HTTP API
    Serve {
        /// Path to the network configuration (defaults apply if missing)
        #[arg(short, long, default_value = "strictly_turns.toml")]
        config: PathBuf,

        /// Override the configured bind port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Play one game between the first two configured parties and print it
    Demo {
        /// Path to the network configuration (defaults apply if missing)
        #[arg(short, long, default_value = "strictly_turns.toml")]
        config: PathBuf,
    },
}
