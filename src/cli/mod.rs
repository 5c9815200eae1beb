//! CLI module for Transmeet.

pub mod commands;
mod output;
mod plain;
pub mod preflight;

pub use output::Output;
pub use plain::PlainTextSink;

use clap::{Parser, Subcommand};

/// Transmeet - Answers from code and meetings
///
/// Routes a question to the right knowledge base (a repository or the meeting
/// transcripts), retrieves supporting context from Qdrant and streams an answer.
#[derive(Parser, Debug)]
#[command(name = "transmeet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TRANSMEET_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question; prints newline-delimited JSON events by default
    Ask {
        /// The question to ask
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Prior conversation, as plain text (also read from piped stdin)
        #[arg(long)]
        history: Option<String>,

        /// Print the answer as plain text instead of JSON events
        #[arg(long)]
        plain: bool,
    },

    /// Retrieve context without generating an answer
    Search {
        /// Search query
        query: String,

        /// Search only this collection (default: every knowledge base)
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// List the configured knowledge bases
    Catalog,

    /// Check credentials, catalog and vector store connectivity
    Doctor,

    /// Start HTTP API server streaming answer events
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
