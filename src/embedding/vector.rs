// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding vector normalization and similarity math.
//!
//! Remote embedding services answer in several shapes: a flat numeric
//! array, a JSON-encoded string holding one, a nested array-of-arrays, or
//! (erroneously) a bare number. `ensure_vector` resolves all of them into a
//! flat `Vec<f32>` once, at the API boundary, so the rest of the crate only
//! ever sees canonical vectors.

use serde_json::Value;
use tracing::warn;

use crate::errors::{MemoryError, Result};

/// Added to the denominator of cosine similarity so an all-zero vector
/// yields a finite score instead of a division by zero.
pub const SIMILARITY_EPSILON: f32 = 1e-8;

/// Normalizes any supported embedding shape into a flat vector of floats.
///
/// Accepted shapes, in resolution order:
/// 1. A string: parsed as JSON and re-resolved.
/// 2. An array whose first element is an array: only the first inner row is
///    kept. Additional rows are discarded with a warning (single-embedding
///    requests should never produce more than one row; if a batch response
///    ever lands here the warning is the visible signal).
/// 3. An array of numbers: every element cast to `f32`.
/// 4. A single number: rejected — a scalar is never a valid embedding.
pub fn ensure_vector(value: &Value) -> Result<Vec<f32>> {
    match value {
        Value::String(raw) => {
            let parsed: Value =
                serde_json::from_str(raw).map_err(|e| MemoryError::MalformedResponse {
                    reason: format!("embedding string is not valid JSON: {e}"),
                })?;
            ensure_vector(&parsed)
        }
        Value::Array(items) => match items.first() {
            Some(Value::Array(first)) => {
                if items.len() > 1 {
                    warn!(
                        discarded = items.len() - 1,
                        "nested embedding response held multiple rows; keeping only the first"
                    );
                }
                collect_floats(first)
            }
            _ => collect_floats(items),
        },
        Value::Number(_) => Err(MemoryError::ScalarEmbedding),
        other => Err(MemoryError::MalformedResponse {
            reason: format!("unsupported embedding shape: {}", kind_of(other)),
        }),
    }
}

fn collect_floats(items: &[Value]) -> Result<Vec<f32>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_f64()
                .map(|v| v as f32)
                .ok_or_else(|| MemoryError::MalformedResponse {
                    reason: format!("embedding element {} is not a number ({})", i, kind_of(item)),
                })
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Computes cosine similarity between two equal-length vectors.
///
/// Callers ranking stored rows must check dimensions first (see
/// `rank::rank_log`); this function assumes `a.len() == b.len()`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    dot / (norm_a * norm_b + SIMILARITY_EPSILON)
}
