//! `dh load-docs`: bulk-load a JSON file of pre-chunked knowledge
//! documents into their own collection.

use std::path::Path;

use anyhow::{Context, Result};
use discussion_harness_core::knowledge::{KnowledgeDoc, KnowledgeLoader};

use crate::config::Config;
use crate::progress::{format_number, StderrProgress};
use crate::typesense::TypesenseStore;

/// Read and parse a knowledge file.
pub fn read_knowledge_file(path: &Path) -> Result<Vec<KnowledgeDoc>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge file: {}", path.display()))?;
    let docs = KnowledgeDoc::parse_file(&content)
        .with_context(|| format!("Failed to parse knowledge file: {}", path.display()))?;
    Ok(docs)
}

pub async fn run_load_docs(
    config: &Config,
    file: &Path,
    collection: Option<&str>,
    recreate: bool,
) -> Result<()> {
    // The file is parsed before the store is touched.
    let docs = read_knowledge_file(file)?;
    let collection = collection.unwrap_or(&config.knowledge.collection);

    let store = TypesenseStore::from_env(&config.index)?;
    let loader = KnowledgeLoader::new(&store, collection);
    let progress = StderrProgress::for_tty(collection);

    let report = loader
        .load(&docs, recreate, |n, total| progress.report(n, total))
        .await?;

    println!(
        "Loaded {} documents into '{}'; collection holds {}.",
        format_number(report.documents as u64),
        loader.collection(),
        format_number(report.found)
    );
    Ok(())
}
