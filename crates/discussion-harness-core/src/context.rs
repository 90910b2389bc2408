//! Token-budgeted context assembly.
//!
//! Formats ranked search hits into text blocks and packs them, in rank
//! order, into a single blob for the generation prompt. Packing is greedy
//! and stops at the first block that does not fit.

use crate::models::SearchHit;

/// Separator placed between blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Separator placed between comments inside a block.
pub const COMMENT_SEPARATOR: &str = " | ";

/// Approximate chars-per-token ratio for the heuristic tokenizer.
const CHARS_PER_TOKEN: usize = 4;

/// Counts tokens the way the downstream model will.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Estimates one token per four bytes of text, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.len().div_ceil(CHARS_PER_TOKEN)
    }
}

/// Packed context ready for the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    /// Number of leading hits that made it in.
    pub hits_used: usize,
    /// Token count of `text` as measured by the tokenizer.
    pub token_count: usize,
}

/// Render one hit as a context block.
pub fn format_block(hit: &SearchHit) -> String {
    let doc = &hit.document;
    format!(
        "Title: {}\n\nBody: {}\n\nComments: {}",
        doc.title,
        doc.body_text,
        doc.comments.join(COMMENT_SEPARATOR)
    )
}

/// Pack `hits` into at most `max_tokens` tokens.
///
/// The budget is checked against the whole candidate text, separators
/// included, so `tokenizer.count_tokens(&result.text) <= max_tokens`
/// always holds.
pub fn assemble(hits: &[SearchHit], max_tokens: usize, tokenizer: &dyn Tokenizer) -> AssembledContext {
    let mut context = AssembledContext::default();

    for hit in hits {
        let block = format_block(hit);
        let candidate = if context.text.is_empty() {
            block
        } else {
            format!("{}{}{}", context.text, BLOCK_SEPARATOR, block)
        };

        let tokens = tokenizer.count_tokens(&candidate);
        if tokens > max_tokens {
            break;
        }

        context.text = candidate;
        context.token_count = tokens;
        context.hits_used += 1;
    }

    context
}
