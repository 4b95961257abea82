// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding client interface and implementations.
//!
//! `HttpEmbedder` talks to a hosted text-embedding API over HTTPS and is
//! the production path; `DummyEmbedder` returns zero vectors for offline
//! use and CI.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::{Config, EmbeddingProviderType};
use crate::embedding::retry::RetryPolicy;
use crate::embedding::vector::ensure_vector;
use crate::errors::{MemoryError, Result};

/// Default embedding dimension for the dummy provider
/// (matches sentence-transformers/all-MiniLM-L6-v2).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Trait for turning text into a fixed-length vector.
pub trait Embedder {
    /// Returns the model identifier.
    fn model_id(&self) -> &str;

    /// Generates an embedding for a single text.
    ///
    /// Empty or whitespace-only input fails with `MemoryError::EmptyInput`
    /// before any remote call is made.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Builds the embedder selected by the configuration.
pub fn create_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    match config.embedding().provider() {
        EmbeddingProviderType::Http => Ok(Box::new(HttpEmbedder::from_config(config)?)),
        EmbeddingProviderType::Dummy => Ok(Box::new(DummyEmbedder::new(
            config.embedding().dummy_dimension(),
        ))),
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Remote embedding provider backed by an HTTP API.
pub struct HttpEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl HttpEmbedder {
    /// Builds a client from configuration.
    ///
    /// The API key is read from the env var named in `[embedding]
    /// api_key_env`; a missing or empty value fails with
    /// `MissingCredential` here, before any request is attempted.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedding = config.embedding();
        let env_var = embedding.api_key_env().to_string();
        let api_key = std::env::var(&env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(MemoryError::MissingCredential { env_var })?;

        let timeout_secs = embedding.timeout_secs();
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(MemoryError::Transport)?;

        Ok(Self {
            client,
            endpoint: embedding.endpoint().to_string(),
            model: embedding.model().to_string(),
            api_key,
            timeout_secs,
            retry: RetryPolicy::from_config(config.retry()),
        })
    }

    fn request(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MemoryError::RemoteService {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let payload: Value = response
            .json()
            .map_err(|e| MemoryError::MalformedResponse {
                reason: format!("response body is not JSON: {e}"),
            })?;
        extract_embedding(&payload)
    }

    fn transport_error(&self, err: reqwest::Error) -> MemoryError {
        if err.is_timeout() {
            MemoryError::Timeout {
                seconds: self.timeout_secs,
            }
        } else {
            MemoryError::Transport(err)
        }
    }
}

impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(MemoryError::EmptyInput);
        }
        self.retry.run(|| self.request(text))
    }
}

/// Locates the embedding value inside a response payload.
///
/// Services disagree on where the vector lives: OpenAI-style bodies nest it
/// under `data[0].embedding`, others use a top-level `embedding` or
/// `embeddings` field, and some return the bare array. Whatever is found is
/// normalized through `ensure_vector`.
fn extract_embedding(payload: &Value) -> Result<Vec<f32>> {
    if let Some(rows) = payload.get("data").and_then(Value::as_array) {
        if let Some(embedding) = rows.first().and_then(|row| row.get("embedding")) {
            return ensure_vector(embedding);
        }
    }
    if let Some(embedding) = payload.get("embedding") {
        return ensure_vector(embedding);
    }
    if let Some(embedding) = payload.get("embeddings") {
        return ensure_vector(embedding);
    }
    if payload.is_array() || payload.is_string() {
        return ensure_vector(payload);
    }

    Err(MemoryError::MalformedResponse {
        reason: "response holds no embedding field".to_string(),
    })
}

/// Dummy provider that returns zero vectors (for testing/offline use).
pub struct DummyEmbedder {
    model: String,
    dimension: usize,
}

impl DummyEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            model: "dummy".to_string(),
            dimension,
        }
    }
}

impl Embedder for DummyEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(MemoryError::EmptyInput);
        }
        Ok(vec![0.0; self.dimension])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dummy_embedder_dimension() {
        let embedder = DummyEmbedder::new(384);
        assert_eq!(embedder.model_id(), "dummy");
        let vector = embedder.embed("hello").unwrap();
        assert_eq!(vector.len(), 384);
        assert!(vector.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_input_is_rejected() {
        let embedder = DummyEmbedder::new(4);
        assert!(matches!(embedder.embed(""), Err(MemoryError::EmptyInput)));
        assert!(matches!(
            embedder.embed("   \n"),
            Err(MemoryError::EmptyInput)
        ));
    }

    #[test]
    fn extract_openai_style_body() {
        let payload = json!({
            "object": "list",
            "data": [{"object": "embedding", "embedding": [0.1, 0.2], "index": 0}],
            "model": "text-embedding-3-small"
        });
        assert_eq!(extract_embedding(&payload).unwrap(), vec![0.1, 0.2]);
    }

    #[test]
    fn extract_flat_embedding_field() {
        let payload = json!({"embedding": [1.0, 2.0]});
        assert_eq!(extract_embedding(&payload).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn extract_nested_embeddings_field() {
        // Batch-shaped field from a single-text request: first row wins.
        let payload = json!({"embeddings": [[1.0, 2.0]]});
        assert_eq!(extract_embedding(&payload).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn extract_bare_array_body() {
        let payload = json!([0.5, 0.25]);
        assert_eq!(extract_embedding(&payload).unwrap(), vec![0.5, 0.25]);
    }

    #[test]
    fn extract_rejects_vectorless_body() {
        let payload = json!({"status": "ok"});
        assert!(matches!(
            extract_embedding(&payload),
            Err(MemoryError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn missing_credential_detected_at_construction() {
        let var = "RECALL_TEST_ABSENT_KEY";
        std::env::remove_var(var);

        let mut config = Config::default();
        config.embedding.api_key_env = Some(var.to_string());

        match HttpEmbedder::from_config(&config) {
            Err(MemoryError::MissingCredential { env_var }) => assert_eq!(env_var, var),
            Err(other) => panic!("expected MissingCredential, got {other:?}"),
            Ok(_) => panic!("expected MissingCredential, got an embedder"),
        }
    }
}
