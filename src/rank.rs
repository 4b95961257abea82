// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relevance ranking of an interaction log against a query.
//!
//! Brute-force cosine scoring over the stored vectors. Logs are small
//! (one per entity), so there is no index; every row is scored and the
//! top k survive.

use std::cmp::Ordering;

use crate::embedding::vector::cosine_similarity;
use crate::embedding::Embedder;
use crate::errors::{MemoryError, Result};
use crate::store::{InteractionLog, InteractionMeta, InteractionStore};

/// Ranks the aligned rows of `log` against `query_vector`.
///
/// Returns at most `k` metadata records, best first, each with
/// `similarity` set. Ties keep the earlier interaction first. A stored
/// vector whose dimension differs from the query's fails the whole query
/// with `DimensionMismatch` naming the offending row.
pub fn rank_log(
    log: &InteractionLog,
    query_vector: &[f32],
    k: usize,
) -> Result<Vec<InteractionMeta>> {
    let n = log.embeddings.len().min(log.metadata.len());
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut scored: Vec<(usize, f32)> = Vec::with_capacity(n);
    for (row, embedding) in log.embeddings[..n].iter().enumerate() {
        if embedding.len() != query_vector.len() {
            return Err(MemoryError::DimensionMismatch {
                row,
                expected: query_vector.len(),
                found: embedding.len(),
            });
        }
        scored.push((row, cosine_similarity(embedding, query_vector)));
    }

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);

    Ok(scored
        .into_iter()
        .map(|(row, similarity)| {
            let mut meta = log.metadata[row].clone();
            meta.similarity = Some(similarity);
            meta
        })
        .collect())
}

/// Ranks an entity's interaction history by semantic similarity.
pub struct RelevanceRanker<'a> {
    embedder: &'a dyn Embedder,
}

impl<'a> RelevanceRanker<'a> {
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self { embedder }
    }

    /// Embeds `query` and returns the entity's top-k most similar
    /// interactions. An entity with an empty log yields an empty result,
    /// not an error.
    pub fn top_k(
        &self,
        store: &InteractionStore,
        entity_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<InteractionMeta>> {
        let query_vector = self.embedder.embed(query)?;
        let log = store.read_all(entity_id)?;
        rank_log(&log, &query_vector, k)
    }
}
