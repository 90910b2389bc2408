//! Token counting for context budgets.
//!
//! Wraps tiktoken BPE encodings behind the core [`Tokenizer`] trait. The
//! heuristic encoding skips BPE entirely and estimates four characters per
//! token.

use anyhow::{Context, Result};
use discussion_harness_core::context::{HeuristicTokenizer, Tokenizer};
use tiktoken_rs::{cl100k_base, o200k_base, p50k_base, CoreBPE};

use crate::config::TokenEncoding;

/// BPE token counter.
pub struct TiktokenTokenizer {
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    pub fn new(encoding: TokenEncoding) -> Result<Self> {
        let bpe = match encoding {
            TokenEncoding::Cl100kBase => cl100k_base(),
            TokenEncoding::O200kBase => o200k_base(),
            TokenEncoding::P50kBase => p50k_base(),
            TokenEncoding::Heuristic => anyhow::bail!("heuristic encoding has no BPE tables"),
        }
        .with_context(|| format!("Failed to load {:?} tokenizer", encoding))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Build the tokenizer for `encoding`.
pub fn create_tokenizer(encoding: TokenEncoding) -> Result<Box<dyn Tokenizer>> {
    match encoding {
        TokenEncoding::Heuristic => Ok(Box::new(HeuristicTokenizer)),
        other => Ok(Box::new(TiktokenTokenizer::new(other)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cl100k_counts() {
        let tokenizer = create_tokenizer(TokenEncoding::Cl100kBase).unwrap();
        let text = "Hello, world!";
        let tokens = tokenizer.count_tokens(text);
        assert!(tokens > 0);
        assert!(tokens < text.len());
        assert_eq!(tokenizer.count_tokens(""), 0);
    }

    #[test]
    fn test_deterministic() {
        let tokenizer = create_tokenizer(TokenEncoding::O200kBase).unwrap();
        let text = "Typo tolerance trades precision for recall.";
        assert_eq!(tokenizer.count_tokens(text), tokenizer.count_tokens(text));
    }

    #[test]
    fn test_heuristic() {
        let tokenizer = create_tokenizer(TokenEncoding::Heuristic).unwrap();
        assert_eq!(tokenizer.count_tokens("abcdefgh"), 2);
    }
}
