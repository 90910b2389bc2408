//! Index store abstraction.
//!
//! The [`IndexStore`] trait covers every operation the pipeline needs from
//! a full-text search engine. The application crate implements it over
//! Typesense; [`memory::InMemoryStore`] backs the tests.
//!
//! Documents cross the trait as JSON objects keyed by a string `id`, the
//! way Typesense stores them. Typed records are encoded before upsert and
//! decoded by the callers that know their shape.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Field type in a collection schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "string[]")]
    StringArray,
    /// Any other engine type, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldSchema {
    fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
        }
    }
}

/// A named collection and its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

impl CollectionSchema {
    /// The fixed schema for indexed discussion chunks.
    pub fn discussions(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: vec![
                FieldSchema::new("repository", FieldType::String),
                FieldSchema::new("title", FieldType::String),
                FieldSchema::new("bodyText", FieldType::String),
                FieldSchema::new("createdAt", FieldType::String),
                FieldSchema::new("url", FieldType::String),
                FieldSchema::new("author", FieldType::String),
                FieldSchema::new("comments", FieldType::StringArray),
            ],
        }
    }

    /// The fixed schema for pre-chunked knowledge documents.
    pub fn knowledge(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: vec![
                FieldSchema::new("content", FieldType::String),
                FieldSchema::new("source", FieldType::String),
            ],
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Parameters for a single search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Query text; `*` matches every document.
    pub q: String,
    /// Fields to match against, OR-combined.
    pub query_by: Vec<String>,
    /// Maximum edit distance per query token.
    pub num_typos: u8,
    /// Maximum number of hits returned.
    pub per_page: usize,
}

/// One raw hit as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHit {
    /// The stored JSON object, `id` included.
    pub document: Value,
    pub text_match: u64,
}

impl StoredHit {
    pub fn id(&self) -> Option<&str> {
        self.document.get("id").and_then(Value::as_str)
    }
}

/// Result of a search call.
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    /// Total number of matching documents (may exceed `hits.len()`).
    pub found: u64,
    pub hits: Vec<StoredHit>,
}

/// Errors reported by an [`IndexStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The store answered but refused the request.
    #[error("rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never got a usable answer.
    #[error("transport: {0}")]
    Transport(String),
}

/// Abstract full-text index backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`retrieve_collection`](IndexStore::retrieve_collection) | Read collection metadata; `NotFound` when absent |
/// | [`create_collection`](IndexStore::create_collection) | Create a collection; `AlreadyExists` on conflict |
/// | [`upsert_document`](IndexStore::upsert_document) | Insert or overwrite a JSON document by its `id` |
/// | [`search`](IndexStore::search) | Typo-tolerant multi-field search |
/// | [`delete_collection`](IndexStore::delete_collection) | Drop a collection and its documents |
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn retrieve_collection(&self, name: &str) -> Result<CollectionSchema, StoreError>;

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError>;

    async fn upsert_document(
        &self,
        collection: &str,
        document: &Value,
    ) -> Result<(), StoreError>;

    async fn search(
        &self,
        collection: &str,
        params: &SearchParams,
    ) -> Result<SearchResponse, StoreError>;

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError>;
}
