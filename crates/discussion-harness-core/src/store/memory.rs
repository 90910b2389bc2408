//! In-memory [`IndexStore`] implementation for tests and offline runs.
//!
//! Collections live in a `HashMap` behind `std::sync::RwLock`. Search is a
//! brute-force scan: query and field text are lowercased and split into
//! alphanumeric tokens, and a query token matches a field token when their
//! edit distance is within `num_typos`. Exact token matches score higher
//! than fuzzy ones; ties keep insertion order. String fields are matched
//! as-is and string arrays as their space-joined elements.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::{CollectionSchema, IndexStore, SearchParams, SearchResponse, StoreError, StoredHit};

const EXACT_SCORE: u64 = 2;
const FUZZY_SCORE: u64 = 1;

struct MemCollection {
    schema: CollectionSchema,
    docs: Vec<Value>,
    positions: HashMap<String, usize>,
}

/// In-memory index store.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, MemCollection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents in `collection`, or `None` if it does not exist.
    pub fn document_count(&self, collection: &str) -> Option<usize> {
        let collections = self.collections.read().ok()?;
        collections.get(collection).map(|c| c.docs.len())
    }

    /// Fetch a stored document by id.
    pub fn get_document(&self, collection: &str, id: &str) -> Option<Value> {
        let collections = self.collections.read().ok()?;
        let c = collections.get(collection)?;
        c.positions.get(id).map(|&i| c.docs[i].clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Transport("in-memory store lock poisoned".to_string())
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

fn field_text(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    }
}

fn score_document(doc: &Value, query_tokens: &[String], params: &SearchParams) -> u64 {
    let doc_tokens: Vec<String> = params
        .query_by
        .iter()
        .filter_map(|f| field_text(doc, f))
        .flat_map(|t| tokenize(&t))
        .collect();

    query_tokens
        .iter()
        .map(|q| {
            if doc_tokens.iter().any(|d| d == q) {
                EXACT_SCORE
            } else if params.num_typos > 0
                && doc_tokens
                    .iter()
                    .any(|d| edit_distance(d, q) <= usize::from(params.num_typos))
            {
                FUZZY_SCORE
            } else {
                0
            }
        })
        .sum()
}

#[async_trait]
impl IndexStore for InMemoryStore {
    async fn retrieve_collection(&self, name: &str) -> Result<CollectionSchema, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        collections
            .get(name)
            .map(|c| c.schema.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        if collections.contains_key(&schema.name) {
            return Err(StoreError::AlreadyExists(schema.name.clone()));
        }
        collections.insert(
            schema.name.clone(),
            MemCollection {
                schema: schema.clone(),
                docs: Vec::new(),
                positions: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert_document(
        &self,
        collection: &str,
        document: &Value,
    ) -> Result<(), StoreError> {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Rejected {
                status: 400,
                message: "Document is missing a string `id`.".to_string(),
            })?
            .to_string();

        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let c = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(collection.to_string()))?;
        match c.positions.get(&id) {
            Some(&i) => c.docs[i] = document.clone(),
            None => {
                c.positions.insert(id, c.docs.len());
                c.docs.push(document.clone());
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        params: &SearchParams,
    ) -> Result<SearchResponse, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let c = collections
            .get(collection)
            .ok_or_else(|| StoreError::NotFound(collection.to_string()))?;

        for field in &params.query_by {
            if !c.schema.has_field(field) {
                return Err(StoreError::Rejected {
                    status: 400,
                    message: format!("Could not find a field named `{}` in the schema.", field),
                });
            }
        }

        let mut scored: Vec<(u64, &Value)> = if params.q.trim() == "*" {
            c.docs.iter().map(|d| (0, d)).collect()
        } else {
            let query_tokens = tokenize(&params.q);
            c.docs
                .iter()
                .map(|d| (score_document(d, &query_tokens, params), d))
                .filter(|(score, _)| *score > 0)
                .collect()
        };

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let found = scored.len() as u64;
        let hits = scored
            .into_iter()
            .take(params.per_page)
            .map(|(score, d)| StoredHit {
                document: d.clone(),
                text_match: score,
            })
            .collect();

        Ok(SearchResponse { found, hits })
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IndexedDocument;

    fn doc(id: &str, title: &str, body: &str) -> Value {
        serde_json::to_value(IndexedDocument {
            id: id.to_string(),
            repository: "acme/widget".to_string(),
            title: title.to_string(),
            body_text: body.to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            url: String::new(),
            author: "octocat".to_string(),
            comments: vec!["see the memory docs".to_string()],
        })
        .unwrap()
    }

    fn params(q: &str, num_typos: u8) -> SearchParams {
        SearchParams {
            q: q.to_string(),
            query_by: vec![
                "title".to_string(),
                "bodyText".to_string(),
                "comments".to_string(),
            ],
            num_typos,
            per_page: 10,
        }
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .create_collection(&CollectionSchema::discussions("c"))
            .await
            .unwrap();
        store
            .upsert_document("c", &doc("d1", "Agent memory", "agents forget context"))
            .await
            .unwrap();
        store
            .upsert_document("c", &doc("d2", "Tool calling", "tools return json"))
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("agent", "agent"), 0);
        assert_eq!(edit_distance("agent", "agnet"), 2);
        assert_eq!(edit_distance("agent", "agents"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[tokio::test]
    async fn test_create_twice_reports_already_exists() {
        let store = seeded().await;
        let err = store
            .create_collection(&CollectionSchema::discussions("c"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.retrieve_collection("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let store = seeded().await;
        store
            .upsert_document("c", &doc("d1", "Agent memory v2", "rewritten"))
            .await
            .unwrap();
        assert_eq!(store.document_count("c"), Some(2));
        assert_eq!(store.get_document("c", "d1").unwrap()["title"], "Agent memory v2");
    }

    #[tokio::test]
    async fn test_typo_tolerance() {
        let store = seeded().await;
        let strict = store.search("c", &params("agnts", 0)).await.unwrap();
        assert!(strict.hits.is_empty());
        let fuzzy = store.search("c", &params("agnts", 1)).await.unwrap();
        assert_eq!(fuzzy.hits.len(), 1);
        assert_eq!(fuzzy.hits[0].id(), Some("d1"));
    }

    #[tokio::test]
    async fn test_multi_field_or_matching() {
        let store = seeded().await;
        let res = store.search("c", &params("memory json", 0)).await.unwrap();
        // "memory" appears in both documents' comments; d1 also has it in the title.
        assert_eq!(res.found, 2);
    }

    #[tokio::test]
    async fn test_wildcard_and_limit() {
        let store = seeded().await;
        let mut p = params("*", 0);
        p.per_page = 1;
        let res = store.search("c", &p).await.unwrap();
        assert_eq!(res.found, 2);
        assert_eq!(res.hits.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_field_rejected() {
        let store = seeded().await;
        let mut p = params("agent", 0);
        p.query_by = vec!["nope".to_string()];
        let err = store.search("c", &p).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_upsert_without_id_rejected() {
        let store = seeded().await;
        let err = store
            .upsert_document("c", &serde_json::json!({ "title": "no id" }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 400, .. }));
        assert_eq!(store.document_count("c"), Some(2));
    }

    #[tokio::test]
    async fn test_searches_any_document_shape() {
        let store = InMemoryStore::new();
        store
            .create_collection(&CollectionSchema::knowledge("k"))
            .await
            .unwrap();
        store
            .upsert_document(
                "k",
                &serde_json::json!({ "id": "k1", "content": "collections hold documents", "source": "docs/a.md" }),
            )
            .await
            .unwrap();
        let p = SearchParams {
            q: "documents".to_string(),
            query_by: vec!["content".to_string()],
            num_typos: 0,
            per_page: 10,
        };
        let res = store.search("k", &p).await.unwrap();
        assert_eq!(res.hits[0].id(), Some("k1"));
        assert_eq!(res.hits[0].document["source"], "docs/a.md");
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let store = seeded().await;
        store.delete_collection("c").await.unwrap();
        assert_eq!(store.document_count("c"), None);
        assert!(store.delete_collection("c").await.is_err());
    }
}
