//! Typesense-backed [`IndexStore`].
//!
//! Talks to the Typesense REST API directly with `reqwest`:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | retrieve collection | `GET /collections/{name}` |
//! | create collection | `POST /collections` |
//! | upsert document | `POST /collections/{name}/documents?action=upsert` |
//! | search | `GET /collections/{name}/documents/search` |
//! | delete collection | `DELETE /collections/{name}` |
//!
//! The API key comes from `TYPESENSE_API_KEY` and is sent in the
//! `X-TYPESENSE-API-KEY` header.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use discussion_harness_core::store::{
    CollectionSchema, IndexStore, SearchParams, SearchResponse, StoreError, StoredHit,
};
use serde::Deserialize;
use serde_json::Value;

use crate::config::IndexConfig;

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

/// HTTP client for one Typesense node.
pub struct TypesenseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TypesenseStore {
    pub fn new(config: &IndexConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build()
            .context("Failed to build Typesense HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url(),
            api_key: api_key.into(),
        })
    }

    /// Build a store with the key from `TYPESENSE_API_KEY`.
    pub fn from_env(config: &IndexConfig) -> Result<Self> {
        let api_key = std::env::var("TYPESENSE_API_KEY")
            .map_err(|_| anyhow::anyhow!("TYPESENSE_API_KEY environment variable not set"))?;
        Self::new(config, api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        req.header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    found: u64,
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    document: Value,
    #[serde(default)]
    text_match: u64,
}

/// Turn a non-success response into a [`StoreError`], mapping 404 and 409
/// to their dedicated variants.
async fn error_for(resp: reqwest::Response, subject: &str) -> StoreError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);
    match status {
        404 => StoreError::NotFound(subject.to_string()),
        409 => StoreError::AlreadyExists(subject.to_string()),
        _ => StoreError::Rejected { status, message },
    }
}

/// Query string for a search call.
pub fn search_query(params: &SearchParams) -> Vec<(&'static str, String)> {
    vec![
        ("q", params.q.clone()),
        ("query_by", params.query_by.join(",")),
        ("num_typos", params.num_typos.to_string()),
        ("per_page", params.per_page.to_string()),
    ]
}

#[async_trait]
impl IndexStore for TypesenseStore {
    async fn retrieve_collection(&self, name: &str) -> Result<CollectionSchema, StoreError> {
        let resp = self
            .send(self.client.get(self.url(&format!("/collections/{}", name))))
            .await?;
        if !resp.status().is_success() {
            return Err(error_for(resp, name).await);
        }
        resp.json()
            .await
            .map_err(|e| StoreError::Transport(format!("invalid collection response: {}", e)))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError> {
        let resp = self
            .send(self.client.post(self.url("/collections")).json(schema))
            .await?;
        if !resp.status().is_success() {
            return Err(error_for(resp, &schema.name).await);
        }
        Ok(())
    }

    async fn upsert_document(
        &self,
        collection: &str,
        document: &Value,
    ) -> Result<(), StoreError> {
        let url = self.url(&format!("/collections/{}/documents", collection));
        let resp = self
            .send(
                self.client
                    .post(url)
                    .query(&[("action", "upsert")])
                    .json(document),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(error_for(resp, collection).await);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        params: &SearchParams,
    ) -> Result<SearchResponse, StoreError> {
        let url = self.url(&format!("/collections/{}/documents/search", collection));
        let resp = self
            .send(self.client.get(url).query(&search_query(params)))
            .await?;
        if !resp.status().is_success() {
            return Err(error_for(resp, collection).await);
        }
        let raw: RawSearchResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Transport(format!("invalid search response: {}", e)))?;
        Ok(SearchResponse {
            found: raw.found,
            hits: raw
                .hits
                .into_iter()
                .map(|h| StoredHit {
                    document: h.document,
                    text_match: h.text_match,
                })
                .collect(),
        })
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let resp = self
            .send(self.client.delete(self.url(&format!("/collections/{}", name))))
            .await?;
        if !resp.status().is_success() {
            return Err(error_for(resp, name).await);
        }
        Ok(())
    }
}
