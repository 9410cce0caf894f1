//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the undelivered message store
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch inbound events read from a JSON-lines file
    Dispatch {
        /// File with one `{"message_type": ..., "payload": {...}}` per line
        events: PathBuf,
        /// Treat the application as backgrounded
        #[arg(short, long)]
        background: bool,
        /// Install an in-app listener that claims every message
        #[arg(long)]
        claim: bool,
    },
    /// Inspect or replay messages that fell back to a notification
    Undelivered {
        #[command(subcommand)]
        action: UndeliveredAction,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum UndeliveredAction {
    /// List stored records without removing them
    List,
    /// Print every stored record and clear the store
    Replay,
}
