// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// docrank - Persona-driven document section ranking
///
/// Extracts sections from a document collection and ranks them by semantic
/// relevance to a persona and the job they need done.
#[derive(Parser, Debug)]
#[command(name = "docrank")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Embedding provider override
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliProvider {
    /// In-process all-MiniLM-L6-v2
    Builtin,
    /// External embedding command
    Command,
    /// OpenAI-compatible HTTP endpoint
    Remote,
    /// Offline feature hashing
    Hashing,
}

impl From<CliProvider> for docrank::config::EmbeddingProviderType {
    fn from(value: CliProvider) -> Self {
        use docrank::config::EmbeddingProviderType as P;
        match value {
            CliProvider::Builtin => P::Builtin,
            CliProvider::Command => P::Command,
            CliProvider::Remote => P::Remote,
            CliProvider::Hashing => P::Hashing,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank the sections of a document collection
    #[command(alias = "r")]
    Rank {
        /// Collection directory holding the request, documents and output
        #[arg(short, long, default_value = ".", help_heading = "Collection")]
        collection: String,

        /// Request file (overrides the collection layout)
        #[arg(short, long, help_heading = "Collection")]
        input: Option<String>,

        /// Output file (overrides the collection layout)
        #[arg(short, long, help_heading = "Collection")]
        output: Option<String>,

        /// Documents directory (overrides the collection layout)
        #[arg(short = 'd', long, help_heading = "Collection")]
        documents_dir: Option<String>,

        /// Embedding provider
        #[arg(long, value_enum, help_heading = "Embeddings")]
        provider: Option<CliProvider>,

        /// Embedding model identifier
        #[arg(long, help_heading = "Embeddings")]
        model: Option<String>,

        /// Maximum concurrent embedding calls
        #[arg(long, help_heading = "Embeddings")]
        concurrency: Option<usize>,

        /// Sections to show in text output
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,

        /// Rank without writing the output file
        #[arg(long)]
        dry_run: bool,

        /// Suppress progress and summary output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Score ad-hoc passages against a persona and task
    Score {
        /// Persona role
        #[arg(long)]
        persona: String,

        /// Task description
        #[arg(long)]
        task: String,

        /// Passages to score
        #[arg(required = true)]
        passages: Vec<String>,

        /// Embedding provider
        #[arg(long, value_enum)]
        provider: Option<CliProvider>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
