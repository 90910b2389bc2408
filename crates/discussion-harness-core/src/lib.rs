//! # Discussion Harness Core
//!
//! Pure retrieval-and-evaluation logic for Discussion Harness: data models,
//! word chunking, the index store abstraction, typo-tolerant search,
//! approach evaluation, token-budgeted context assembly, and bulk loading
//! of pre-chunked knowledge documents.
//!
//! This crate contains no HTTP clients, databases, or configuration
//! loading. Network-backed collaborators (Typesense, GitHub, OpenAI) live
//! in the `discussion-harness` application crate and plug in through the
//! [`store::IndexStore`] and [`context::Tokenizer`] traits.

pub mod chunk;
pub mod context;
pub mod error;
pub mod evaluate;
pub mod index;
pub mod knowledge;
pub mod models;
pub mod search;
pub mod store;

pub use error::{Error, Result};
