//! # docqa CLI
//!
//! The `docqa` binary answers natural-language questions over a local
//! corpus of technical documentation using hybrid (semantic + keyword)
//! retrieval and a local text-generation model.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa index` | Chunk the corpus and build (or restore) both indices |
//! | `docqa search "<query>"` | Print the fused retrieval ranking for a query |
//! | `docqa ask "<question>"` | Answer a single question with citations |
//! | `docqa chat` | Interactive question loop (exit with `bye` or Ctrl-D) |
//!
//! ## Examples
//!
//! ```bash
//! # Build the indices (embeds every chunk on first run)
//! docqa index --config ./config/docqa.toml
//!
//! # Inspect what retrieval returns for a query
//! docqa search "interrupt latency" --limit 5
//!
//! # One-shot question answering
//! docqa ask "how does the scheduler pick the next thread?"
//!
//! # Interactive session
//! docqa chat
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docqa::config;
use docqa::error::Error;
use docqa::pipeline::Pipeline;
use docqa::repl;

/// docqa — grounded question answering over local technical documentation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Grounded question answering over local technical documentation",
    version,
    long_about = "docqa chunks a documentation corpus along its heading structure, indexes the \
    chunks in a persistent vector index and an in-memory keyword index, fuses both rankings per \
    query, and synthesizes an answer grounded in the retrieved passages, with citations."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Build the chunk set and both indices.
    ///
    /// Loads the corpus, splits it along headings and size bounds, then
    /// embeds every chunk and persists the vector index — unless a
    /// persisted artifact already exists, in which case it is restored
    /// and embedding is skipped entirely.
    Index {
        /// Discard any persisted vector index and re-embed from scratch.
        #[arg(long)]
        rebuild: bool,
    },

    /// Print the fused retrieval ranking for a query, without generation.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to print.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ask a single question and print the grounded answer with citations.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Interactive question loop (exit with `bye` or Ctrl-D).
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docqa=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { rebuild } => {
            if rebuild && cfg.index.dir.exists() {
                std::fs::remove_dir_all(&cfg.index.dir)?;
            }
            let index_dir = cfg.index.dir.clone();
            let pipeline = Pipeline::build(cfg).await?;
            println!("index");
            println!("  documents: {}", pipeline.document_count());
            println!("  fragments: {}", pipeline.fragment_count());
            println!("  chunks: {}", pipeline.chunk_count());
            println!("  vectors: {}", pipeline.vector_count());
            println!("  artifact: {}", index_dir.display());
            println!("ok");
        }
        Commands::Search { query, limit } => {
            let pipeline = Pipeline::build(cfg).await?;
            let mut results = pipeline.retrieve(&query).await?;
            if let Some(limit) = limit {
                results.truncate(limit);
            }
            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (rank, result) in results.iter().enumerate() {
                let snippet: String = result.chunk.text.chars().take(160).collect();
                println!(
                    "{:>2}. [{:.4}] {}",
                    rank + 1,
                    result.score,
                    docqa::models::Citation {
                        source: result.chunk.source.clone(),
                        hierarchy: result.chunk.hierarchy.clone(),
                    }
                );
                println!("    {}", snippet.replace('\n', " "));
            }
        }
        Commands::Ask { question } => {
            let pipeline = Pipeline::build(cfg).await?;
            match pipeline.answer(&question).await {
                Ok(answer) => {
                    println!("{}", answer.answer);
                    if !answer.citations.is_empty() {
                        println!();
                        println!("Sources:");
                        for citation in &answer.citations {
                            println!("  {}", citation);
                        }
                    }
                }
                Err(Error::Generation { source, citations }) => {
                    eprintln!("Error: {:#}", source);
                    if !citations.is_empty() {
                        println!("Sources:");
                        for citation in &citations {
                            println!("  {}", citation);
                        }
                    }
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Chat => {
            let pipeline = Pipeline::build(cfg).await?;
            repl::run_chat(&pipeline).await?;
        }
    }

    Ok(())
}
