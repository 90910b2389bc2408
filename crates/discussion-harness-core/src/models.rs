//! Core data models used throughout Discussion Harness.
//!
//! These types represent the discussions, indexed documents, and search
//! hits that flow through the ingestion and retrieval pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Number of leading chunk characters that go into a legacy document id.
pub const ID_PREFIX_CHARS: usize = 50;

/// A source repository, addressed as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `"owner/name"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, name) = s.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }

    /// The composite key stored in the `repository` field.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A comment attached to a discussion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub body_text: String,
    pub author: String,
}

/// A discussion thread as fetched from the source API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionRecord {
    pub title: String,
    pub body_text: String,
    /// Creation timestamp exactly as reported upstream (ISO 8601).
    pub created_at: String,
    pub url: String,
    pub author: String,
    /// At most the first five comments, in thread order.
    pub comments: Vec<Comment>,
}

/// How document ids are derived from chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityScheme {
    /// `owner_repo_createdAt_<first 50 chars of chunk>`. Collides when two
    /// discussions share a timestamp and a chunk prefix.
    #[default]
    Legacy,
    /// SHA-256 over repository, timestamp, chunk index, and full chunk text.
    ContentHash,
}

impl IdentityScheme {
    pub fn document_id(
        &self,
        repo: &RepoRef,
        created_at: &str,
        chunk_index: usize,
        chunk: &str,
    ) -> String {
        match self {
            IdentityScheme::Legacy => {
                let prefix: String = chunk.chars().take(ID_PREFIX_CHARS).collect();
                format!("{}_{}_{}_{}", repo.owner, repo.name, created_at, prefix)
            }
            IdentityScheme::ContentHash => {
                let mut hasher = Sha256::new();
                hasher.update(repo.owner.as_bytes());
                hasher.update(b"\0");
                hasher.update(repo.name.as_bytes());
                hasher.update(b"\0");
                hasher.update(created_at.as_bytes());
                hasher.update(b"\0");
                hasher.update((chunk_index as u64).to_le_bytes());
                hasher.update(chunk.as_bytes());
                format!("{:x}", hasher.finalize())
            }
        }
    }
}

/// One chunk of a discussion, shaped for the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    pub id: String,
    pub repository: String,
    pub title: String,
    pub body_text: String,
    pub created_at: String,
    pub url: String,
    pub author: String,
    #[serde(default)]
    pub comments: Vec<String>,
}

impl IndexedDocument {
    /// Build the document for one chunk of `discussion`.
    ///
    /// Discussion-level metadata (title, author, comments) is copied
    /// verbatim into every chunk; comment authorship is dropped.
    pub fn from_chunk(
        repo: &RepoRef,
        discussion: &DiscussionRecord,
        chunk_index: usize,
        chunk: &str,
        scheme: IdentityScheme,
    ) -> Self {
        Self {
            id: scheme.document_id(repo, &discussion.created_at, chunk_index, chunk),
            repository: repo.full_name(),
            title: discussion.title.clone(),
            body_text: chunk.to_string(),
            created_at: discussion.created_at.clone(),
            url: discussion.url.clone(),
            author: discussion.author.clone(),
            comments: discussion
                .comments
                .iter()
                .map(|c| c.body_text.clone())
                .collect(),
        }
    }

    /// Check the document before it crosses the store boundary.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.id.trim().is_empty() {
            Some("empty id")
        } else if RepoRef::parse(&self.repository).is_none() {
            Some("repository must be 'owner/repo'")
        } else if self.body_text.trim().is_empty() {
            Some("empty bodyText")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(Error::Write {
                id: self.id.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: IndexedDocument,
    /// Engine relevance score (higher is better). Rank is the hit's
    /// position in the result list.
    #[serde(default)]
    pub text_match: u64,
}

impl SearchHit {
    pub fn id(&self) -> &str {
        &self.document.id
    }
}
