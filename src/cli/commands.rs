use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "convcache")]
#[command(author, version, about = "Browse paginated chat conversations through a shared LRU cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where conversations are read from. Falls back to `http.base_url` from settings.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory holding one `{key}.json` file per conversation
    #[arg(long, conflicts_with = "url")]
    pub dir: Option<PathBuf>,

    /// Base URL of the chat backend REST API
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the newest page of a conversation
    Dump {
        key: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Keep paging backwards until the start of the conversation
        #[arg(short, long)]
        all: bool,
    },

    /// Interactively page through and switch between conversations
    Browse {
        key: String,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Load several conversations into the cache concurrently
    Prefetch {
        #[arg(required = true)]
        keys: Vec<String>,

        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, default_value = "4")]
        concurrency: usize,
    },
}
