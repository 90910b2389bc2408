//! # Discussion Harness
//!
//! Retrieval-augmented question answering over GitHub Discussions.
//!
//! Discussions are fetched from the GitHub GraphQL API, split into
//! fixed-size word chunks, and upserted into a Typesense collection.
//! Questions are answered by searching the collection with one of several
//! typo-tolerance approaches, packing the best hits into a token-bounded
//! context, and handing that context to a completions model. Every answer
//! is logged to SQLite with its retrieval metrics and an optional rating.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │ GitHub       │──▶│ Chunk +      │──▶│ Typesense │
//! │ Discussions  │   │ Upsert       │   │           │
//! └──────────────┘   └──────────────┘   └─────┬─────┘
//!                                             │
//!                  ┌──────────────────────────┘
//!                  ▼
//!           ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//!           │ Evaluate     │──▶│ Assemble     │──▶│ Generate │──▶ SQLite log
//!           │ approaches   │   │ context      │   │          │
//!           └──────────────┘   └──────────────┘   └──────────┘
//! ```
//!
//! The pure pipeline (chunking, identity, store trait, search, evaluation,
//! context assembly) lives in `discussion-harness-core`. This crate adds
//! the HTTP backends, configuration, the response log, and the `dh` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with env overrides |
//! | [`github`] | GitHub Discussions GraphQL fetcher |
//! | [`typesense`] | Typesense REST index store |
//! | [`tokenizer`] | tiktoken token counting |
//! | [`generate`] | Completions-based answer generation |
//! | [`ingest`] | Fetch + chunk + upsert orchestration |
//! | [`load_docs`] | Knowledge file loading |
//! | [`progress`] | Progress lines on stderr |
//! | [`ask`] | Approach selection, context, generation |
//! | [`responses`] | Response log |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | Response log schema |

pub mod ask;
pub mod collection;
pub mod config;
pub mod db;
pub mod evaluate;
pub mod generate;
pub mod github;
pub mod ingest;
pub mod load_docs;
pub mod migrate;
pub mod progress;
pub mod responses;
pub mod search;
pub mod tokenizer;
pub mod typesense;
