//! Command-line interface definitions for modemsync.
//!
//! Uses clap's derive API for type-safe argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Modem port registry client.
///
/// modemsync keeps a local registry of modem ports in sync with a modem
/// backend: it scans for attached ports, connects to them and follows the
/// backend's live status feed, persisting what it learns between runs.
#[derive(Parser, Debug)]
#[command(name = "modemsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to additional config file.
    ///
    /// This config file is merged on top of the user config, giving it the
    /// highest priority (except for CLI flags).
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides `server.base_url`).
    #[arg(long = "server", value_name = "URL", global = true)]
    pub server: Option<String>,

    /// Directory for saved state (overrides `storage.state_dir`).
    #[arg(long = "state-dir", value_name = "DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Keep state in memory only; nothing is read from or written to disk.
    #[arg(long = "ephemeral", global = true)]
    pub ephemeral: bool,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = info level
    /// -vv   = debug level
    /// -vvv  = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Subcommands for modemsync.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan for attached ports and add them to the registry.
    Scan,

    /// Connect to ports (all known ports when none are given).
    Connect {
        /// Ports to connect.
        ports: Vec<String>,

        /// Keep following the live status feed until interrupted.
        #[arg(short = 'f', long = "follow")]
        follow: bool,
    },

    /// Disconnect ports (all known ports when none are given).
    ///
    /// Disconnecting without a selection also clears the saved registry.
    Disconnect {
        /// Ports to disconnect.
        ports: Vec<String>,
    },

    /// Re-query details for a single port.
    Refresh {
        /// Port to refresh.
        port: String,
    },

    /// Print the registry.
    Show {
        /// Sort by this field (repeat the field name to sort descending).
        #[arg(short = 's', long = "sort", value_name = "FIELD")]
        sort: Vec<String>,

        /// Print the raw JSON snapshot instead of a table.
        #[arg(long = "json")]
        json: bool,
    },

    /// Manage displayed columns.
    Columns {
        /// Column action.
        #[command(subcommand)]
        action: ColumnAction,
    },
}

/// Column layout actions.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ColumnAction {
    /// List visible columns in display order.
    List,
    /// Move a column to a position (0 is leftmost).
    Move {
        /// Column key.
        key: String,
        /// Target position.
        position: usize,
    },
    /// Hide a column.
    Hide {
        /// Column key.
        key: String,
    },
    /// Show a hidden column.
    Show {
        /// Column key.
        key: String,
    },
}
