//! Word-count text chunker.
//!
//! Splits discussion body text into consecutive slices of at most
//! `max_words` whitespace-delimited words. Chunking is a pure function of
//! its input: the same text always yields the same chunks in the same
//! order, which is what keeps document ids stable across ingestion runs.

/// Default chunk size in words.
pub const DEFAULT_MAX_WORDS: usize = 200;

/// Split `text` into chunks of `max_words` words.
///
/// Every chunk except the last holds exactly `max_words` words, words
/// inside a chunk are joined by a single space, and empty or
/// whitespace-only text yields no chunks. A `max_words` of 0 is treated
/// as 1.
pub fn chunk_words(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(max_words).map(|w| w.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_words("", 200).is_empty());
        assert!(chunk_words(" \n\t ", 200).is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_words("Hello,   world!", 200);
        assert_eq!(chunks, vec!["Hello, world!"]);
    }

    #[test]
    fn test_450_words_makes_two_full_and_one_partial() {
        let chunks = chunk_words(&words(450), 200);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].split(' ').count(), 200);
        assert_eq!(chunks[1].split(' ').count(), 200);
        assert_eq!(chunks[2].split(' ').count(), 50);
        assert!(chunks[1].starts_with("w200 "));
    }

    #[test]
    fn test_round_trip_reproduces_normalized_text() {
        let text = "  The quick\tbrown fox\n\njumps over\r\n the   lazy dog.  ";
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        for n in 1..=10 {
            let chunks = chunk_words(text, n);
            assert_eq!(chunks.join(" "), normalized, "round trip failed for n={}", n);
        }
    }

    #[test]
    fn test_size_bound_for_all_but_last() {
        for n in [1, 3, 7, 200] {
            let chunks = chunk_words(&words(523), n);
            let (last, rest) = chunks.split_last().unwrap();
            for c in rest {
                assert_eq!(c.split(' ').count(), n);
            }
            assert!(last.split(' ').count() <= n);
        }
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_chunk() {
        let chunks = chunk_words(&words(400), 200);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_zero_max_words_treated_as_one() {
        let chunks = chunk_words("a b c", 0);
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deterministic() {
        let text = words(333);
        assert_eq!(chunk_words(&text, 50), chunk_words(&text, 50));
    }
}
