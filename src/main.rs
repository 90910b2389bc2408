//! # Discussion Harness CLI (`dh`)
//!
//! Ingests GitHub Discussions into Typesense and answers questions over
//! them.
//!
//! ## Usage
//!
//! ```bash
//! dh --config ./config/dh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dh init` | Create the collection and the response log |
//! | `dh ingest [owner/name..]` | Fetch, chunk, and upsert discussions |
//! | `dh search "<query>"` | Ranked hits for a query |
//! | `dh evaluate "<query>" --relevant <id>..` | Score approaches against judgments |
//! | `dh context "<query>"` | Show the assembled context |
//! | `dh ask "<question>"` | Answer a question and log it |
//! | `dh responses` | List logged answers |
//! | `dh load-docs <file.json>` | Bulk-load pre-chunked knowledge documents |
//! | `dh verify` | Count indexed documents |
//! | `dh drop --yes` | Delete the collection |
//!
//! Credentials are read from the environment (or a `.env` file):
//! `TYPESENSE_API_KEY`, `GITHUB_TOKEN`, `OPENAI_API_KEY`. Logs go to stderr
//! and follow `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use discussion_harness::{
    ask, collection, config, evaluate, ingest, load_docs, responses, search,
};

/// Discussion Harness CLI: retrieval-augmented answers over GitHub
/// Discussions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/dh.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "dh",
    about = "Discussion Harness: retrieval-augmented answers over GitHub Discussions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index collection and the response log schema.
    ///
    /// Idempotent: an existing collection is left untouched.
    Init,

    /// Fetch discussions and upsert them into the collection.
    ///
    /// A failure for one repository is reported and the run continues.
    Ingest {
        /// Repositories as `owner/name`; defaults to the configured list.
        repos: Vec<String>,

        /// Fetch and chunk, print counts, write nothing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search the collection.
    Search {
        query: String,

        /// Maximum edits per query token (0-2).
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2))]
        typos: Option<u8>,

        /// Maximum number of hits.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Score every configured approach against known-relevant document ids.
    Evaluate {
        query: String,

        /// Ids of documents relevant to the query.
        #[arg(long, num_args = 1.., required = true)]
        relevant: Vec<String>,
    },

    /// Print the context that would be sent to the model.
    Context {
        query: String,

        /// Token budget; defaults to `context.max_tokens`.
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Answer a question from the indexed discussions.
    Ask {
        question: String,

        /// Relevant document ids; when given, the best approach by F1 is used.
        #[arg(long, num_args = 1..)]
        relevant: Vec<String>,

        /// Rate the answer (1-5) in the response log.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: Option<u8>,
    },

    /// List recently logged answers.
    Responses {
        #[arg(long, default_value = "10")]
        limit: i64,
    },

    /// Load a JSON array of `{id, content, metadata: {source}}` records
    /// into a knowledge collection.
    ///
    /// Records are upserted by id, so loading a file twice is harmless.
    LoadDocs {
        file: PathBuf,

        /// Target collection; defaults to `knowledge.collection`.
        #[arg(long)]
        collection: Option<String>,

        /// Drop the collection before loading.
        #[arg(long)]
        recreate: bool,
    },

    /// Report how many documents the collection holds.
    Verify,

    /// Delete the collection and every document in it.
    Drop {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => collection::run_init(&cfg).await?,
        Commands::Ingest { repos, dry_run } => ingest::run_ingest(&cfg, &repos, dry_run).await?,
        Commands::Search {
            query,
            typos,
            limit,
        } => search::run_search(&cfg, &query, typos, limit).await?,
        Commands::Evaluate { query, relevant } => {
            evaluate::run_evaluate(&cfg, &query, &relevant).await?
        }
        Commands::Context { query, max_tokens } => {
            search::run_context(&cfg, &query, max_tokens).await?
        }
        Commands::Ask {
            question,
            relevant,
            rating,
        } => ask::run_ask(&cfg, &question, &relevant, rating.map(f64::from)).await?,
        Commands::Responses { limit } => responses::run_responses(&cfg, limit).await?,
        Commands::LoadDocs {
            file,
            collection,
            recreate,
        } => load_docs::run_load_docs(&cfg, &file, collection.as_deref(), recreate).await?,
        Commands::Verify => collection::run_verify(&cfg).await?,
        Commands::Drop { yes } => collection::run_drop(&cfg, yes).await?,
    }

    Ok(())
}
