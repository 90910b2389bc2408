//! Index writer: collection bootstrap and idempotent chunk upserts.
//!
//! Each discussion is chunked by word count and every chunk becomes its own
//! [`IndexedDocument`], keyed by an id derived from the repository, the
//! discussion timestamp, and the chunk text. Re-indexing identical input
//! reproduces the same ids, so repeated runs overwrite instead of
//! duplicating.

use tracing::{debug, info};

use crate::chunk::chunk_words;
use crate::error::{Error, Result};
use crate::models::{DiscussionRecord, IdentityScheme, IndexedDocument, RepoRef};
use crate::store::{CollectionSchema, IndexStore, StoreError};

/// Counts from one [`IndexWriter::index_discussions`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub discussions: usize,
    pub documents: usize,
}

/// Writes discussions into one collection of an [`IndexStore`].
pub struct IndexWriter<'a> {
    store: &'a dyn IndexStore,
    collection: String,
    max_words: usize,
    identity: IdentityScheme,
}

impl<'a> IndexWriter<'a> {
    pub fn new(
        store: &'a dyn IndexStore,
        collection: impl Into<String>,
        max_words: usize,
        identity: IdentityScheme,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            max_words,
            identity,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection with the discussion schema unless it exists.
    ///
    /// Returns `true` when the collection was created by this call.
    pub async fn ensure_collection(&self) -> Result<bool> {
        ensure_collection(self.store, &CollectionSchema::discussions(&self.collection)).await
    }

    /// Validate and upsert one document.
    pub async fn upsert(&self, document: &IndexedDocument) -> Result<()> {
        upsert(self.store, &self.collection, document).await
    }

    /// Build the documents for one discussion without writing them.
    pub fn documents_for(&self, repo: &RepoRef, discussion: &DiscussionRecord) -> Vec<IndexedDocument> {
        chunk_words(&discussion.body_text, self.max_words)
            .iter()
            .enumerate()
            .map(|(i, chunk)| IndexedDocument::from_chunk(repo, discussion, i, chunk, self.identity))
            .collect()
    }

    /// Ensure the collection, then chunk and upsert every discussion.
    ///
    /// Stops at the first failed write; documents written before it stay in
    /// the index.
    pub async fn index_discussions(
        &self,
        repo: &RepoRef,
        discussions: &[DiscussionRecord],
    ) -> Result<IndexReport> {
        self.ensure_collection().await?;

        let mut report = IndexReport::default();
        for discussion in discussions {
            for document in self.documents_for(repo, discussion) {
                self.upsert(&document).await?;
                report.documents += 1;
            }
            report.discussions += 1;
        }

        info!(
            repository = %repo,
            discussions = report.discussions,
            documents = report.documents,
            "indexed discussions into '{}'",
            self.collection
        );
        Ok(report)
    }
}

/// Create `schema` unless a collection with that name already exists.
pub async fn ensure_collection(store: &dyn IndexStore, schema: &CollectionSchema) -> Result<bool> {
    match store.retrieve_collection(&schema.name).await {
        Ok(_) => {
            info!("Collection '{}' already exists.", schema.name);
            return Ok(false);
        }
        Err(StoreError::NotFound(_)) => {}
        Err(e) => {
            return Err(Error::Schema(format!(
                "cannot inspect collection '{}': {}",
                schema.name, e
            )))
        }
    }

    match store.create_collection(schema).await {
        Ok(()) => {
            info!("Collection '{}' created.", schema.name);
            Ok(true)
        }
        // Lost a creation race to another writer.
        Err(StoreError::AlreadyExists(_)) => {
            info!("Collection '{}' already exists.", schema.name);
            Ok(false)
        }
        Err(e) => Err(Error::SchemaConflict {
            collection: schema.name.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Validate `document` and write it at its id.
pub async fn upsert(store: &dyn IndexStore, collection: &str, document: &IndexedDocument) -> Result<()> {
    document.validate()?;
    let encoded = serde_json::to_value(document).map_err(|e| Error::Write {
        id: document.id.clone(),
        reason: e.to_string(),
    })?;
    store
        .upsert_document(collection, &encoded)
        .await
        .map_err(|e| Error::Write {
            id: document.id.clone(),
            reason: e.to_string(),
        })?;
    debug!(id = %document.id, "upserted document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::store::{SearchParams, SearchResponse};
    use async_trait::async_trait;
    use std::collections::HashSet;

    fn discussion(created_at: &str, words: usize) -> DiscussionRecord {
        DiscussionRecord {
            title: format!("Discussion {}", created_at),
            body_text: (0..words)
                .map(|i| format!("{}w{}", created_at, i))
                .collect::<Vec<_>>()
                .join(" "),
            created_at: created_at.to_string(),
            url: format!("https://github.com/acme/widget/discussions/{}", created_at),
            author: "octocat".to_string(),
            comments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_three_discussions_make_nine_documents() {
        let store = InMemoryStore::new();
        let writer = IndexWriter::new(&store, "c", 200, IdentityScheme::Legacy);
        let repo = RepoRef::new("acme", "widget");
        let discussions: Vec<_> = ["2024-01-01", "2024-01-02", "2024-01-03"]
            .iter()
            .map(|t| discussion(t, 450))
            .collect();

        let report = writer.index_discussions(&repo, &discussions).await.unwrap();
        assert_eq!(report, IndexReport { discussions: 3, documents: 9 });
        assert_eq!(store.document_count("c"), Some(9));

        let docs: Vec<_> = discussions
            .iter()
            .flat_map(|d| writer.documents_for(&repo, d))
            .collect();
        let ids: HashSet<_> = docs.iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids.len(), 9);
        assert!(docs.iter().all(|d| d.repository == "acme/widget"));
    }

    #[tokio::test]
    async fn test_reindexing_is_idempotent() {
        let store = InMemoryStore::new();
        let writer = IndexWriter::new(&store, "c", 200, IdentityScheme::Legacy);
        let repo = RepoRef::new("acme", "widget");
        let discussions = vec![discussion("2024-01-01", 450), discussion("2024-01-02", 10)];

        writer.index_discussions(&repo, &discussions).await.unwrap();
        writer.index_discussions(&repo, &discussions).await.unwrap();
        assert_eq!(store.document_count("c"), Some(4));
    }

    #[tokio::test]
    async fn test_empty_body_yields_no_documents() {
        let store = InMemoryStore::new();
        let writer = IndexWriter::new(&store, "c", 200, IdentityScheme::Legacy);
        let repo = RepoRef::new("acme", "widget");
        let report = writer
            .index_discussions(&repo, &[discussion("2024-01-01", 0)])
            .await
            .unwrap();
        assert_eq!(report, IndexReport { discussions: 1, documents: 0 });
    }

    #[tokio::test]
    async fn test_ensure_collection_is_idempotent() {
        let store = InMemoryStore::new();
        let writer = IndexWriter::new(&store, "c", 200, IdentityScheme::Legacy);
        assert!(writer.ensure_collection().await.unwrap());
        assert!(!writer.ensure_collection().await.unwrap());
    }

    /// Store whose every call fails at the transport level.
    struct BrokenStore;

    #[async_trait]
    impl IndexStore for BrokenStore {
        async fn retrieve_collection(&self, name: &str) -> Result<CollectionSchema, StoreError> {
            Err(StoreError::NotFound(name.to_string()))
        }
        async fn create_collection(&self, _: &CollectionSchema) -> Result<(), StoreError> {
            Err(StoreError::Rejected {
                status: 400,
                message: "bad schema".to_string(),
            })
        }
        async fn upsert_document(&self, _: &str, _: &serde_json::Value) -> Result<(), StoreError> {
            Err(StoreError::Transport("connection refused".to_string()))
        }
        async fn search(&self, _: &str, _: &SearchParams) -> Result<SearchResponse, StoreError> {
            Err(StoreError::Transport("connection refused".to_string()))
        }
        async fn delete_collection(&self, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_failure_is_schema_conflict() {
        let writer = IndexWriter::new(&BrokenStore, "c", 200, IdentityScheme::Legacy);
        let err = writer.ensure_collection().await.unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { .. }));
    }

    #[tokio::test]
    async fn test_upsert_failure_is_write_error() {
        let writer = IndexWriter::new(&BrokenStore, "c", 200, IdentityScheme::Legacy);
        let repo = RepoRef::new("acme", "widget");
        let doc = writer.documents_for(&repo, &discussion("2024-01-01", 5)).remove(0);
        let err = writer.upsert(&doc).await.unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert!(err.is_retryable());
    }
}
