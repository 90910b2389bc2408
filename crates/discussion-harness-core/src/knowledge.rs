//! Bulk loading of pre-chunked knowledge documents.
//!
//! A knowledge file is a JSON array of `{id, content, metadata: {source}}`
//! records that were chunked upstream. Each record is stored as-is in its
//! own collection with a fixed `{content, source}` schema, keyed by the
//! record's id, so loading the same file again overwrites rather than
//! duplicates.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::index::ensure_collection;
use crate::search::Searcher;
use crate::store::{CollectionSchema, IndexStore, StoreError};

/// Collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "typesense_docs";

/// One record of a knowledge file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KnowledgeDoc {
    pub id: String,
    pub content: String,
    pub metadata: KnowledgeMetadata,
}

/// Record metadata; keys other than `source` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KnowledgeMetadata {
    pub source: String,
}

/// Stored shape of a [`KnowledgeDoc`].
#[derive(Debug, Serialize)]
struct StoredKnowledge<'a> {
    id: &'a str,
    content: &'a str,
    source: &'a str,
}

impl KnowledgeDoc {
    /// Parse a knowledge file body.
    pub fn parse_file(json: &str) -> Result<Vec<KnowledgeDoc>> {
        serde_json::from_str(json)
            .map_err(|e| Error::Schema(format!("invalid knowledge file: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Write {
                id: self.id.clone(),
                reason: "document id is empty".to_string(),
            });
        }
        Ok(())
    }

    fn encode(&self) -> Result<serde_json::Value> {
        serde_json::to_value(StoredKnowledge {
            id: &self.id,
            content: &self.content,
            source: &self.metadata.source,
        })
        .map_err(|e| Error::Write {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// Counts from one [`KnowledgeLoader::load`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Documents upserted by this call.
    pub documents: usize,
    /// Documents in the collection afterwards.
    pub found: u64,
}

/// Loads knowledge documents into one collection.
pub struct KnowledgeLoader<'a> {
    store: &'a dyn IndexStore,
    collection: String,
}

impl<'a> KnowledgeLoader<'a> {
    pub fn new(store: &'a dyn IndexStore, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Drop the collection if it exists. A failed delete is logged and
    /// loading goes on.
    pub async fn drop_existing(&self) {
        match self.store.delete_collection(&self.collection).await {
            Ok(()) => info!("Deleted collection '{}'.", self.collection),
            Err(StoreError::NotFound(_)) => {}
            Err(e) => warn!("Could not delete collection '{}': {}", self.collection, e),
        }
    }

    /// Ensure the collection, upsert every document, then count what the
    /// collection holds.
    ///
    /// `progress` is called with `(done, total)` after each upsert. Stops at
    /// the first failed write.
    pub async fn load<F>(&self, docs: &[KnowledgeDoc], recreate: bool, mut progress: F) -> Result<LoadReport>
    where
        F: FnMut(usize, usize),
    {
        if recreate {
            self.drop_existing().await;
        }
        ensure_collection(self.store, &CollectionSchema::knowledge(&self.collection)).await?;

        let total = docs.len();
        for (i, doc) in docs.iter().enumerate() {
            doc.validate()?;
            let encoded = doc.encode()?;
            self.store
                .upsert_document(&self.collection, &encoded)
                .await
                .map_err(|e| Error::Write {
                    id: doc.id.clone(),
                    reason: e.to_string(),
                })?;
            progress(i + 1, total);
        }

        let found = Searcher::new(self.store, &self.collection)
            .count_by("content")
            .await?;
        info!(
            documents = total,
            found, "loaded knowledge documents into '{}'", self.collection
        );
        Ok(LoadReport {
            documents: total,
            found,
        })
    }
}
