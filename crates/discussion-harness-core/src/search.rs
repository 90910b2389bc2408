//! Typo-tolerant multi-field search over an [`IndexStore`].
//!
//! The ranking itself belongs to the engine; this layer validates the
//! request, caps the result count, maps store failures onto
//! [`Error::Query`], and decodes stored documents into [`SearchHit`]s.

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{IndexedDocument, SearchHit};
use crate::store::{IndexStore, SearchParams};

/// Highest per-token edit distance the engine accepts.
pub const MAX_TYPOS: u8 = 2;

/// Searches one collection.
pub struct Searcher<'a> {
    store: &'a dyn IndexStore,
    collection: String,
}

impl<'a> Searcher<'a> {
    pub fn new(store: &'a dyn IndexStore, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Run `query` against `fields`, tolerating up to `num_typos` edits per
    /// token, and return at most `limit` hits in relevance order.
    ///
    /// A blank query returns no hits without touching the store.
    pub async fn search(
        &self,
        query: &str,
        fields: &[String],
        num_typos: u8,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        if fields.is_empty() {
            return Err(Error::Query("no fields to search".to_string()));
        }
        if num_typos > MAX_TYPOS {
            return Err(Error::Query(format!(
                "num_typos must be at most {}, got {}",
                MAX_TYPOS, num_typos
            )));
        }
        if limit == 0 {
            return Err(Error::Query("limit must be at least 1".to_string()));
        }
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let params = SearchParams {
            q: query.to_string(),
            query_by: fields.to_vec(),
            num_typos,
            per_page: limit,
        };
        let response = self
            .store
            .search(&self.collection, &params)
            .await
            .map_err(|e| Error::Query(format!("search in '{}' failed: {}", self.collection, e)))?;

        debug!(
            found = response.found,
            returned = response.hits.len(),
            num_typos,
            "search '{}'",
            query
        );

        response
            .hits
            .into_iter()
            .take(limit)
            .map(|hit| {
                let document: IndexedDocument =
                    serde_json::from_value(hit.document).map_err(|e| {
                        Error::Schema(format!(
                            "unexpected document in '{}': {}",
                            self.collection, e
                        ))
                    })?;
                Ok(SearchHit {
                    document,
                    text_match: hit.text_match,
                })
            })
            .collect()
    }

    /// Total number of documents in a discussion collection.
    pub async fn count_documents(&self) -> Result<u64> {
        self.count_by("repository").await
    }

    /// Total number of documents, via a `*` query over `field`.
    pub async fn count_by(&self, field: &str) -> Result<u64> {
        let params = SearchParams {
            q: "*".to_string(),
            query_by: vec![field.to_string()],
            num_typos: 0,
            per_page: 1,
        };
        let response = self
            .store
            .search(&self.collection, &params)
            .await
            .map_err(|e| Error::Query(format!("count in '{}' failed: {}", self.collection, e)))?;
        Ok(response.found)
    }
}
