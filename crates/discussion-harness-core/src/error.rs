//! Error taxonomy for the ingestion and retrieval pipeline.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Pipeline errors.
///
/// The variants split into retryable conditions (`Transport`, `Write`),
/// request-level faults that will fail again unless the request changes
/// (`Graph`, `Query`), schema faults that need an operator (`Schema`,
/// `SchemaConflict`), and `NoValidApproach`, which callers should surface
/// as "cannot answer with confidence".
#[derive(Debug, Error)]
pub enum Error {
    /// Network failure or non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The source API answered with protocol-level errors.
    #[error("graph query error: {0}")]
    Graph(String),

    /// The response body did not have the expected shape, or the index
    /// collection could not be inspected.
    #[error("schema error: {0}")]
    Schema(String),

    /// Creating the collection failed for a reason other than it already
    /// existing.
    #[error("cannot create collection '{collection}': {reason}")]
    SchemaConflict { collection: String, reason: String },

    /// Upsert rejected or not delivered.
    #[error("failed to write document '{id}': {reason}")]
    Write { id: String, reason: String },

    /// Malformed search parameters or a failed search call.
    #[error("query error: {0}")]
    Query(String),

    /// No approach produced a usable (F1 > 0) result.
    #[error("no valid retrieval approach ({attempted} attempted, {failed} failed)")]
    NoValidApproach { attempted: usize, failed: usize },
}

impl Error {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Write { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_split() {
        assert!(Error::Transport("timeout".into()).is_retryable());
        assert!(Error::Write {
            id: "a".into(),
            reason: "503".into()
        }
        .is_retryable());
        assert!(!Error::Graph("bad field".into()).is_retryable());
        assert!(!Error::Query("no fields".into()).is_retryable());
        assert!(!Error::NoValidApproach {
            attempted: 2,
            failed: 0
        }
        .is_retryable());
    }
}
