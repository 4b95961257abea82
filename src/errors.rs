// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the memory store, embedding client, and ranker.

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// All failures the library can surface to callers.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The embedding API credential was not found in the configured env var.
    #[error("embedding API key not set (checked ${env_var})")]
    MissingCredential { env_var: String },

    /// The embedding request exceeded its timeout.
    #[error("embedding request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The embedding service answered with a non-success HTTP status.
    #[error("embedding service returned HTTP {status}: {body}")]
    RemoteService { status: u16, body: String },

    /// The embedding response could not be turned into a vector.
    #[error("malformed embedding response: {reason}")]
    MalformedResponse { reason: String },

    /// The embedding response was a single number instead of a vector.
    #[error("embedding response was a single scalar, not a vector")]
    ScalarEmbedding,

    /// Empty or whitespace-only text was passed to `embed`.
    #[error("cannot embed empty input text")]
    EmptyInput,

    /// No entity exists under the given id.
    #[error("no entity with id '{entity_id}'")]
    EntityNotFound { entity_id: String },

    /// An interaction index fell outside the aligned log length.
    #[error("interaction index {index} out of range (log length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A stored embedding's dimension differs from the query vector's.
    #[error("embedding dimension mismatch at row {row}: stored {found}, query {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Network-level failure talking to the embedding service.
    #[error("http transport error: {0}")]
    Transport(reqwest::Error),
}

impl MemoryError {
    /// Whether retrying the same call could plausibly succeed.
    ///
    /// Only the retry policy consults this: timeouts, transport failures,
    /// and throttling/server-side statuses are transient. Credential,
    /// parse, and lookup errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            MemoryError::Timeout { .. } | MemoryError::Transport(_) => true,
            MemoryError::RemoteService { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(MemoryError::Timeout { seconds: 30 }.is_transient());
        assert!(MemoryError::RemoteService {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(MemoryError::RemoteService {
            status: 429,
            body: String::new()
        }
        .is_transient());

        assert!(!MemoryError::RemoteService {
            status: 400,
            body: String::new()
        }
        .is_transient());
        assert!(!MemoryError::MissingCredential {
            env_var: "KEY".into()
        }
        .is_transient());
        assert!(!MemoryError::ScalarEmbedding.is_transient());
        assert!(!MemoryError::EmptyInput.is_transient());
    }
}
