// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory representation of a per-entity interaction log.
//!
//! The log is four index-aligned parallel sequences — the persisted schema
//! keeps them as four named fields, so the in-memory shape mirrors that
//! rather than an array of row structs. `aligned_len` is the effective
//! length whenever the sequences drift apart (e.g. a partial write from
//! another process): operations use the shortest sequence instead of
//! failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{MemoryError, Result};

/// Metadata for one interaction.
///
/// Input and output are duplicated from the parallel sequences so a
/// metadata record is self-describing on its own. `similarity` is only
/// ever set on ranked reads; `extra` passes through any additional fields
/// found in stored records verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionMeta {
    pub input: String,
    pub output: String,
    #[serde(default = "unix_epoch")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

impl InteractionMeta {
    /// Builds a metadata record stamped with the current time.
    pub fn new(input: &str, output: &str, user_id: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            similarity: None,
            extra: Map::new(),
        }
    }
}

/// One row of the log, borrowed from the aligned sequences.
#[derive(Debug)]
pub struct LogRow<'a> {
    pub index: usize,
    pub input: &'a str,
    pub output: &'a str,
    pub meta: &'a InteractionMeta,
}

/// Four index-aligned sequences describing an entity's interactions.
#[derive(Debug, Clone, Default)]
pub struct InteractionLog {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub metadata: Vec<InteractionMeta>,
}

impl InteractionLog {
    /// Effective log length: the shortest of the four sequences.
    pub fn aligned_len(&self) -> usize {
        self.inputs
            .len()
            .min(self.outputs.len())
            .min(self.embeddings.len())
            .min(self.metadata.len())
    }

    /// Whether all four sequences have the same length.
    pub fn is_aligned(&self) -> bool {
        let len = self.inputs.len();
        self.outputs.len() == len && self.embeddings.len() == len && self.metadata.len() == len
    }

    pub fn is_empty(&self) -> bool {
        self.aligned_len() == 0
    }

    /// Appends one element to each of the four sequences.
    pub fn push(
        &mut self,
        input: String,
        output: String,
        embedding: Vec<f32>,
        meta: InteractionMeta,
    ) {
        self.inputs.push(input);
        self.outputs.push(output);
        self.embeddings.push(embedding);
        self.metadata.push(meta);
    }

    /// Removes position `index` from all four sequences.
    ///
    /// Bounds are checked against `aligned_len`, so this also rejects any
    /// index on an empty log.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        let len = self.aligned_len();
        if index >= len {
            return Err(MemoryError::IndexOutOfRange { index, len });
        }
        self.inputs.remove(index);
        self.outputs.remove(index);
        self.embeddings.remove(index);
        self.metadata.remove(index);
        Ok(())
    }

    /// Iterates the aligned rows of the log.
    pub fn rows(&self) -> impl Iterator<Item = LogRow<'_>> {
        (0..self.aligned_len()).map(move |index| LogRow {
            index,
            input: &self.inputs[index],
            output: &self.outputs[index],
            meta: &self.metadata[index],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log(n: usize) -> InteractionLog {
        let mut log = InteractionLog::default();
        for i in 0..n {
            log.push(
                format!("question {i}"),
                format!("answer {i}"),
                vec![i as f32, 1.0],
                InteractionMeta::new(&format!("question {i}"), &format!("answer {i}"), "tester"),
            );
        }
        log
    }

    #[test]
    fn push_keeps_sequences_aligned() {
        let log = sample_log(3);
        assert!(log.is_aligned());
        assert_eq!(log.aligned_len(), 3);
    }

    #[test]
    fn remove_keeps_sequences_aligned_and_ordered() {
        let mut log = sample_log(3);
        log.remove(1).unwrap();

        assert!(log.is_aligned());
        assert_eq!(log.aligned_len(), 2);
        assert_eq!(log.inputs, vec!["question 0", "question 2"]);
        assert_eq!(log.outputs, vec!["answer 0", "answer 2"]);
        assert_eq!(log.embeddings[1], vec![2.0, 1.0]);
        assert_eq!(log.metadata[1].input, "question 2");
    }

    #[test]
    fn remove_out_of_range_fails() {
        let mut log = sample_log(2);
        match log.remove(2) {
            Err(MemoryError::IndexOutOfRange { index, len }) => {
                assert_eq!(index, 2);
                assert_eq!(len, 2);
            }
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn remove_on_empty_log_fails() {
        let mut log = InteractionLog::default();
        assert!(matches!(
            log.remove(0),
            Err(MemoryError::IndexOutOfRange { len: 0, .. })
        ));
    }

    #[test]
    fn aligned_len_uses_shortest_sequence() {
        let mut log = sample_log(3);
        // Simulate a partial write from another process.
        log.outputs.pop();
        assert!(!log.is_aligned());
        assert_eq!(log.aligned_len(), 2);
    }

    #[test]
    fn remove_bounds_use_aligned_len_on_drifted_log() {
        let mut log = sample_log(3);
        log.metadata.pop();
        assert!(matches!(
            log.remove(2),
            Err(MemoryError::IndexOutOfRange { len: 2, .. })
        ));
        log.remove(1).unwrap();
        assert_eq!(log.inputs, vec!["question 0", "question 2"]);
    }

    #[test]
    fn rows_are_truncated_to_aligned_len() {
        let mut log = sample_log(3);
        log.embeddings.pop();
        let rows: Vec<_> = log.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].input, "question 1");
    }

    #[test]
    fn metadata_extra_fields_round_trip() {
        let raw = r#"{
            "input": "hi",
            "output": "hello",
            "timestamp": "2024-05-01T00:00:00Z",
            "user_id": "u1",
            "channel": "web"
        }"#;
        let meta: InteractionMeta = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.extra.get("channel").unwrap(), "web");
        assert_eq!(meta.similarity, None);

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back.get("channel").unwrap(), "web");
        // Unset similarity is not serialized.
        assert!(back.get("similarity").is_none());
    }

    #[test]
    fn metadata_tolerates_missing_fields() {
        let meta: InteractionMeta =
            serde_json::from_str(r#"{"input": "a", "output": "b"}"#).unwrap();
        assert_eq!(meta.timestamp, DateTime::UNIX_EPOCH);
        assert_eq!(meta.user_id, "");
    }
}
