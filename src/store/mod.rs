// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interaction store - append-only per-entity interaction memory.
//!
//! `InteractionStore` is the caller-facing facade: it owns the persistence
//! layer and the embedder, embeds inputs on append, and hands logs to the
//! ranker. All mutations happen on a local copy of the log and land in a
//! single persisted update, so a failed write leaves nothing observable.

pub mod log;
pub mod sqlite;

use std::path::Path;

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::entity::Entity;
use crate::errors::Result;
use crate::rank::RelevanceRanker;

pub use log::{InteractionLog, InteractionMeta, LogRow};
pub use sqlite::EntityStore;

/// Per-entity interaction memory backed by an `EntityStore` and an
/// embedding provider.
pub struct InteractionStore {
    store: EntityStore,
    embedder: Box<dyn Embedder>,
}

impl InteractionStore {
    pub fn new(store: EntityStore, embedder: Box<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Opens the store under `root` with the embedder selected by config.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        let store = EntityStore::from_config(root, config)?;
        Ok(Self::new(store, create_embedder(config)?))
    }

    /// The embedder this store appends and ranks with.
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Appends one interaction: embeds `input`, stamps metadata, and
    /// persists all four sequences in a single update.
    pub fn append(
        &mut self,
        entity_id: &str,
        input: &str,
        output: &str,
        user_id: &str,
    ) -> Result<()> {
        let embedding = self.embedder.embed(input)?;
        self.append_embedded(entity_id, input, output, user_id, embedding)
    }

    /// Appends with a pre-computed embedding.
    ///
    /// A caller retrying after a persistence failure should reuse the
    /// embedding from the failed attempt instead of paying for a second
    /// remote call; this is the entry point for that.
    pub fn append_embedded(
        &mut self,
        entity_id: &str,
        input: &str,
        output: &str,
        user_id: &str,
        embedding: Vec<f32>,
    ) -> Result<()> {
        self.store
            .append_interaction(entity_id, input, output, user_id, embedding)
    }

    /// Removes the interaction at `index`; returns whether the persisted
    /// write reported success.
    pub fn delete_at(&mut self, entity_id: &str, index: usize) -> Result<bool> {
        self.store.delete_interaction(entity_id, index)
    }

    /// Returns the four sequences as stored. Callers should treat
    /// `aligned_len` as the effective length.
    pub fn read_all(&self, entity_id: &str) -> Result<InteractionLog> {
        self.store.read_log(entity_id)
    }

    /// Ranks the entity's past interactions against `query`, best first.
    pub fn recall(&self, entity_id: &str, query: &str, k: usize) -> Result<Vec<InteractionMeta>> {
        RelevanceRanker::new(self.embedder.as_ref()).top_k(self, entity_id, query, k)
    }

    /// Creates a new entity with an empty log.
    pub fn create_entity(&mut self) -> Result<Entity> {
        self.store.create_entity()
    }

    /// Deletes an entity together with its log.
    pub fn delete_entity(&mut self, entity_id: &str) -> Result<bool> {
        self.store.delete_entity(entity_id)
    }

    /// Resolves an entity id or display id to the entity id.
    pub fn resolve(&self, entity_ref: &str) -> Result<String> {
        self.store.resolve(entity_ref)
    }
}
