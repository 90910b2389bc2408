//! `dh search` and `dh context`.

use anyhow::Result;
use discussion_harness_core::context::assemble;
use discussion_harness_core::models::SearchHit;
use discussion_harness_core::search::Searcher;

use crate::config::Config;
use crate::tokenizer::create_tokenizer;
use crate::typesense::TypesenseStore;

/// Characters of body text shown per hit.
const EXCERPT_CHARS: usize = 160;

/// Print ranked hits for `query`.
///
/// Without `--typos` the first configured typo candidate is used.
pub async fn run_search(
    config: &Config,
    query: &str,
    typos: Option<u8>,
    limit: Option<usize>,
) -> Result<()> {
    let store = TypesenseStore::from_env(&config.index)?;
    let searcher = Searcher::new(&store, &config.index.collection);

    let num_typos = typos.unwrap_or_else(|| default_typos(config));
    let limit = limit.unwrap_or(config.retrieval.limit);
    let hits = searcher
        .search(query, &config.retrieval.query_by, num_typos, limit)
        .await?;

    print_hits(&hits);
    Ok(())
}

/// Print the context the first approach would hand to the generator.
pub async fn run_context(config: &Config, query: &str, max_tokens: Option<usize>) -> Result<()> {
    let store = TypesenseStore::from_env(&config.index)?;
    let searcher = Searcher::new(&store, &config.index.collection);
    let tokenizer = create_tokenizer(config.context.encoding)?;

    let hits = searcher
        .search(
            query,
            &config.retrieval.query_by,
            default_typos(config),
            config.retrieval.limit,
        )
        .await?;
    let budget = max_tokens.unwrap_or(config.context.max_tokens);
    let context = assemble(&hits, budget, tokenizer.as_ref());

    if context.hits_used == 0 {
        println!("No context.");
        return Ok(());
    }

    println!("{}", context.text);
    println!();
    println!(
        "({} of {} hits, {} / {} tokens)",
        context.hits_used,
        hits.len(),
        context.token_count,
        budget
    );
    Ok(())
}

fn default_typos(config: &Config) -> u8 {
    config
        .retrieval
        .typo_candidates
        .first()
        .copied()
        .unwrap_or(discussion_harness_core::search::MAX_TYPOS)
}

pub fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results.");
        return;
    }

    for (i, hit) in hits.iter().enumerate() {
        let doc = &hit.document;
        println!("{}. [{}] {} / {}", i + 1, hit.text_match, doc.repository, doc.title);
        println!("    created: {}", doc.created_at);
        println!("    author: {}", doc.author);
        println!("    url: {}", doc.url);
        println!("    excerpt: \"{}\"", excerpt(&doc.body_text));
        println!("    id: {}", doc.id);
        println!();
    }
}

fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let trimmed = flat.trim();
    match trimmed.char_indices().nth(EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
