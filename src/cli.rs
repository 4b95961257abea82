// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// recall - Interaction memory with semantic retrieval
///
/// Keeps an append-only log of (input, output) exchanges per entity and
/// ranks past interactions against new questions by embedding similarity.
#[derive(Parser, Debug)]
#[command(name = "recall")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Data directory holding the memory database (defaults to current directory)
    #[arg(long, global = true)]
    pub path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new entity with an empty interaction log
    Create,

    /// List all entities
    #[command(alias = "ls")]
    List,

    /// Show an entity's interaction log
    Show {
        /// Entity id or display id
        entity: String,
    },

    /// Append an interaction to an entity's log
    Add {
        /// Entity id or display id
        entity: String,

        /// The user-supplied input text (this is what gets embedded)
        #[arg(short, long)]
        input: String,

        /// The stored response text
        #[arg(short, long)]
        output: String,

        /// User recorded in the interaction metadata
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// Delete one interaction by index
    Forget {
        /// Entity id or display id
        entity: String,

        /// Zero-based interaction index
        index: usize,
    },

    /// Rank past interactions against a query
    Ask {
        /// Entity id or display id
        entity: String,

        /// The question to match against stored interactions
        query: String,

        /// Number of results to return
        #[arg(short = 'k', long = "top", default_value_t = 3)]
        top: usize,
    },

    /// Delete an entity and its interaction log
    #[command(alias = "rm")]
    Remove {
        /// Entity id or display id
        entity: String,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
