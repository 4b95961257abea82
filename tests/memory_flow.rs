// SPDX-License-Identifier: MIT OR Apache-2.0

//! Library-level end-to-end flow: append, rank, delete against a real
//! SQLite store with a deterministic stub embedder.

use std::collections::HashMap;

use tempfile::TempDir;

use recall::embedding::Embedder;
use recall::entity::IdFormat;
use recall::errors::{MemoryError, Result};
use recall::rank::RelevanceRanker;
use recall::store::{EntityStore, InteractionStore};

/// Embedder with a fixed text-to-vector table.
struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StubEmbedder {
    fn new(pairs: &[(&str, &[f32])]) -> Self {
        let vectors = pairs
            .iter()
            .map(|(text, vector)| (text.to_string(), vector.to_vec()))
            .collect();
        Self { vectors }
    }
}

impl Embedder for StubEmbedder {
    fn model_id(&self) -> &str {
        "stub"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(MemoryError::EmptyInput);
        }
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| MemoryError::MalformedResponse {
                reason: format!("no stub vector for '{text}'"),
            })
    }
}

fn open_store(dir: &TempDir, embedder: StubEmbedder) -> InteractionStore {
    let entities = EntityStore::open_default(dir.path(), IdFormat::default()).unwrap();
    InteractionStore::new(entities, Box::new(embedder))
}

#[test]
fn append_rank_delete_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(
        &dir,
        StubEmbedder::new(&[
            ("What products do you sell?", &[1.0, 0.0, 0.0]),
            ("Where are you located?", &[0.0, 1.0, 0.0]),
            ("what can I buy from you", &[0.9, 0.1, 0.0]),
        ]),
    );

    let entity = store.create_entity().unwrap();
    store
        .append(
            &entity.entity_id,
            "What products do you sell?",
            "RDP, HPMC, SBR",
            "agent-1",
        )
        .unwrap();
    store
        .append(
            &entity.entity_id,
            "Where are you located?",
            "Addis Ababa",
            "agent-1",
        )
        .unwrap();

    let results = store
        .recall(&entity.entity_id, "what can I buy from you", 1)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].input, "What products do you sell?");
    assert_eq!(results[0].output, "RDP, HPMC, SBR");
    assert_eq!(results[0].user_id, "agent-1");
    let similarity = results[0].similarity.unwrap();
    assert!((similarity - 0.994).abs() < 1e-3, "similarity {similarity}");

    assert!(store.delete_at(&entity.entity_id, 0).unwrap());

    let log = store.read_all(&entity.entity_id).unwrap();
    assert!(log.is_aligned());
    assert_eq!(log.aligned_len(), 1);
    assert_eq!(log.inputs, vec!["Where are you located?"]);
    assert_eq!(log.outputs, vec!["Addis Ababa"]);

    // The log is destroyed together with its entity.
    assert!(store.delete_entity(&entity.entity_id).unwrap());
    assert!(matches!(
        store.read_all(&entity.entity_id),
        Err(MemoryError::EntityNotFound { .. })
    ));
}

#[test]
fn ranker_can_be_driven_directly() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, StubEmbedder::new(&[("anything", &[1.0, 0.0])]));
    let embedder = StubEmbedder::new(&[("anything", &[1.0, 0.0])]);

    // An empty (never-created) store still needs an entity to rank.
    let err = RelevanceRanker::new(&embedder)
        .top_k(&store, "missing", "anything", 3)
        .unwrap_err();
    assert!(matches!(err, MemoryError::EntityNotFound { .. }));
}

#[test]
fn recall_on_empty_log_returns_empty() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir, StubEmbedder::new(&[("hello", &[1.0, 0.0])]));

    let entity = store.create_entity().unwrap();
    let results = store.recall(&entity.entity_id, "hello", 5).unwrap();
    assert!(results.is_empty());
}

#[test]
fn append_to_unknown_entity_fails() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir, StubEmbedder::new(&[("q", &[1.0])]));

    assert!(matches!(
        store.append("missing", "q", "a", "u"),
        Err(MemoryError::EntityNotFound { .. })
    ));
}

#[test]
fn mixed_dimension_history_fails_the_query() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(
        &dir,
        StubEmbedder::new(&[
            ("old question", &[1.0, 0.0]),
            ("new question", &[1.0, 0.0, 0.0]),
            ("query", &[0.0, 1.0, 0.0]),
        ]),
    );

    // Two appends whose embedding model apparently changed in between.
    let entity = store.create_entity().unwrap();
    store
        .append(&entity.entity_id, "old question", "a", "u")
        .unwrap();
    store
        .append(&entity.entity_id, "new question", "a", "u")
        .unwrap();

    match store.recall(&entity.entity_id, "query", 2) {
        Err(MemoryError::DimensionMismatch { row, .. }) => assert_eq!(row, 0),
        other => panic!("expected DimensionMismatch, got {other:?}"),
    }
}

#[test]
fn alignment_holds_across_mixed_operations() {
    static VECTOR: [f32; 2] = [1.0, 0.5];

    let dir = TempDir::new().unwrap();
    let texts: Vec<String> = (0..5).map(|i| format!("question {i}")).collect();
    let pairs: Vec<(&str, &[f32])> = texts
        .iter()
        .map(|t| (t.as_str(), VECTOR.as_slice()))
        .collect();
    let mut store = open_store(&dir, StubEmbedder::new(&pairs));

    let entity = store.create_entity().unwrap();
    for (i, text) in texts.iter().enumerate() {
        store
            .append(&entity.entity_id, text, &format!("answer {i}"), "u")
            .unwrap();
        let log = store.read_all(&entity.entity_id).unwrap();
        assert!(log.is_aligned());
        assert_eq!(log.aligned_len(), i + 1);
    }

    for expected_len in (0..5).rev() {
        assert!(store.delete_at(&entity.entity_id, 0).unwrap());
        let log = store.read_all(&entity.entity_id).unwrap();
        assert!(log.is_aligned());
        assert_eq!(log.aligned_len(), expected_len);
    }

    assert!(matches!(
        store.delete_at(&entity.entity_id, 0),
        Err(MemoryError::IndexOutOfRange { len: 0, .. })
    ));
}

#[test]
fn append_embedded_skips_the_embedder() {
    let dir = TempDir::new().unwrap();
    // No stub vectors at all: any embed() call would fail.
    let mut store = open_store(&dir, StubEmbedder::new(&[]));

    let entity = store.create_entity().unwrap();
    store
        .append_embedded(&entity.entity_id, "q", "a", "u", vec![0.25, 0.75])
        .unwrap();

    let log = store.read_all(&entity.entity_id).unwrap();
    assert_eq!(log.embeddings, vec![vec![0.25, 0.75]]);
}
