mod ask;
mod index;
mod providers;
mod search;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use docs_assistant::state::AppState;

/// Ask questions about a documentation tree, grounded on retrieved passages
#[derive(Parser)]
#[command(name = "docs-assistant")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Overrides DOCS_ROOT
    #[arg(long, global = true)]
    pub docs_root: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a question from the indexed documentation
    Ask {
        question: String,

        /// Use only this provider, without fallback
        #[arg(short, long)]
        provider: Option<String>,

        /// Print the retrieved context before the answer
        #[arg(long)]
        show_context: bool,
    },

    /// Show the passages most similar to a query
    Search {
        query: String,

        /// Number of passages (defaults to TOP_K)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Build the index and write the cache
    Index {
        /// Ignore a valid cache and re-embed everything
        #[arg(short, long)]
        force: bool,
    },

    /// List completion providers and their status
    Providers,
}

pub async fn run(state: &AppState, command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Ask {
            question,
            provider,
            show_context,
        } => ask::ask(state, &question, provider.as_deref(), show_context).await,
        Commands::Search { query, top_k } => search::search(state, &query, top_k).await,
        Commands::Index { force } => index::index(state, force).await,
        Commands::Providers => providers::providers(state),
    }
}
