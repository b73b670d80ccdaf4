//! CLI command definitions for the `cardroom` binary.
//!
//! Uses clap derive macros. `serve` runs the lobby server; `games ...`
//! manages tables directly in the local database.

pub mod games;

use clap::{Parser, Subcommand};

/// Poker lobby server with live game-list updates.
#[derive(Parser)]
#[command(name = "cardroom", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info,tower_http=warn",
            1 => "debug,cardroom=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the lobby server (REST API and websocket).
    Serve {
        /// Host to bind (defaults to `host` in config.toml).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (defaults to `port` in config.toml).
        #[arg(long, short)]
        port: Option<u16>,

        /// Keep games in memory instead of the SQLite database.
        #[arg(long)]
        in_memory: bool,

        /// Also export tracing spans through OpenTelemetry (stdout).
        #[arg(long)]
        otel: bool,
    },

    /// Manage tables.
    Games {
        #[command(subcommand)]
        action: GamesCommand,
    },
}

#[derive(Subcommand)]
pub enum GamesCommand {
    /// List tables, most recently updated first.
    #[command(alias = "ls")]
    List,

    /// Open a new table.
    Create {
        #[arg(long)]
        name: String,

        #[arg(long, default_value_t = 6)]
        max_players: u32,

        #[arg(long)]
        small_blind: u64,

        #[arg(long)]
        big_blind: u64,
    },

    /// Delete a table.
    #[command(alias = "rm")]
    Delete {
        /// Game id.
        id: String,
    },
}
