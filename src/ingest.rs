//! Ingestion orchestration.
//!
//! For each repository: fetch every discussion, chunk bodies, and upsert
//! the chunks into the collection. A failure for one repository is logged
//! and the run moves on to the next.

use anyhow::{bail, Result};
use discussion_harness_core::chunk::chunk_words;
use discussion_harness_core::index::{IndexReport, IndexWriter};
use discussion_harness_core::models::RepoRef;
use tracing::{error, info};

use crate::config::Config;
use crate::github::{DiscussionFetcher, GraphqlTransport, HttpTransport};
use crate::typesense::TypesenseStore;

/// Outcome of ingesting one repository.
#[derive(Debug)]
pub struct RepoOutcome {
    pub repo: RepoRef,
    pub result: discussion_harness_core::Result<IndexReport>,
}

/// Fetch and index every repository in `repos`, in order.
///
/// Never fails as a whole; each repository's outcome is reported
/// separately.
pub async fn ingest_repositories<T: GraphqlTransport>(
    fetcher: &DiscussionFetcher<T>,
    writer: &IndexWriter<'_>,
    repos: &[RepoRef],
) -> Vec<RepoOutcome> {
    let mut outcomes = Vec::with_capacity(repos.len());
    for repo in repos {
        let result = match fetcher.fetch(repo).await {
            Ok(discussions) => writer.index_discussions(repo, &discussions).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!(repository = %repo, "ingest failed, skipping repository: {}", e);
        }
        outcomes.push(RepoOutcome {
            repo: repo.clone(),
            result,
        });
    }
    outcomes
}

/// Resolve the repositories named on the command line, or the configured
/// list when none are given.
pub fn resolve_repositories(config: &Config, names: &[String]) -> Result<Vec<RepoRef>> {
    let repos = if names.is_empty() {
        config.source.repositories.clone()
    } else {
        let mut parsed = Vec::with_capacity(names.len());
        for name in names {
            match RepoRef::parse(name) {
                Some(repo) => parsed.push(repo),
                None => bail!("Invalid repository '{}': expected owner/name", name),
            }
        }
        parsed
    };

    if repos.is_empty() {
        bail!("No repositories to ingest. Add [[source.repositories]] to the config or pass owner/name.");
    }
    Ok(repos)
}

/// `dh ingest`.
pub async fn run_ingest(config: &Config, names: &[String], dry_run: bool) -> Result<()> {
    let repos = resolve_repositories(config, names)?;
    let fetcher = DiscussionFetcher::new(HttpTransport::from_env(&config.source)?);

    if dry_run {
        println!("ingest (dry-run)");
        let mut failed = 0usize;
        for repo in &repos {
            match fetcher.fetch(repo).await {
                Ok(discussions) => {
                    let chunks: usize = discussions
                        .iter()
                        .map(|d| chunk_words(&d.body_text, config.chunking.max_words).len())
                        .sum();
                    println!(
                        "  {}: {} discussions, {} chunks",
                        repo,
                        discussions.len(),
                        chunks
                    );
                }
                Err(e) => {
                    failed += 1;
                    error!(repository = %repo, "fetch failed: {}", e);
                    println!("  {}: failed ({})", repo, e);
                }
            }
        }
        return check_any_succeeded(failed, repos.len(), "fetch");
    }

    let store = TypesenseStore::from_env(&config.index)?;
    let writer = IndexWriter::new(
        &store,
        &config.index.collection,
        config.chunking.max_words,
        config.chunking.identity,
    );

    let outcomes = ingest_repositories(&fetcher, &writer, &repos).await;

    let mut failed = 0usize;
    let mut total_documents = 0usize;
    println!("ingest into '{}'", config.index.collection);
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => {
                total_documents += report.documents;
                println!(
                    "  {}: {} discussions, {} documents",
                    outcome.repo, report.discussions, report.documents
                );
            }
            Err(e) => {
                failed += 1;
                println!("  {}: failed ({})", outcome.repo, e);
            }
        }
    }
    println!("  documents upserted: {}", total_documents);

    info!(
        repositories = outcomes.len(),
        failed, total_documents, "ingest finished"
    );

    check_any_succeeded(failed, outcomes.len(), "ingest")?;
    println!("ok");
    Ok(())
}

/// A run fails as a whole only when every repository failed.
fn check_any_succeeded(failed: usize, total: usize, action: &str) -> Result<()> {
    if total > 0 && failed == total {
        bail!("All {} repositories failed to {}", failed, action);
    }
    Ok(())
}
