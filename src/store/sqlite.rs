// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed persistence for entities and their interaction logs.
//!
//! One row per entity; the interaction log lives in four JSON-encoded
//! sequence columns updated as a single statement, so each append or
//! delete is all-or-nothing. Concurrent writers from other processes are
//! last-write-wins at whole-log granularity — a detected length drift is
//! logged, never raised (a compare-and-swap version column would be the
//! production fix, out of scope here).

use chrono::{DateTime, Datelike, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;
use crate::embedding::vector::ensure_vector;
use crate::entity::{Entity, IdFormat};
use crate::errors::{MemoryError, Result};
use crate::store::log::{InteractionLog, InteractionMeta};

/// SQLite-backed storage for entities and interaction logs.
///
/// Stores data in `.recall/memory.sqlite` by default.
pub struct EntityStore {
    conn: Connection,
    path: PathBuf,
    ids: IdFormat,
}

impl EntityStore {
    /// Opens or creates an entity store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P, ids: IdFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        let store = Self { conn, path, ids };
        store.init_schema()?;

        Ok(store)
    }

    /// Opens an entity store in the default location under a data directory.
    pub fn open_default<P: AsRef<Path>>(root: P, ids: IdFormat) -> Result<Self> {
        let db_path = root.as_ref().join(".recall").join("memory.sqlite");
        Self::open(db_path, ids)
    }

    /// Opens the store described by the configuration, under `root`.
    pub fn from_config(root: &Path, config: &Config) -> Result<Self> {
        let ids = IdFormat::from_config(config.ids());
        match config.store().db_path() {
            Some(db_path) => Self::open(root.join(db_path), ids),
            None => Self::open_default(root, ids),
        }
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entities (
                entity_id TEXT PRIMARY KEY,
                display_id TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                input_conversation TEXT NOT NULL DEFAULT '[]',
                output_conversation TEXT NOT NULL DEFAULT '[]',
                interaction_embeddings TEXT NOT NULL DEFAULT '[]',
                interaction_metadata TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS display_sequences (
                year INTEGER PRIMARY KEY,
                next_seq INTEGER NOT NULL
            );
            "#,
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1')",
            [],
        )?;
        Ok(())
    }

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates a new entity with an empty interaction log.
    pub fn create_entity(&mut self) -> Result<Entity> {
        let now = Utc::now();
        let year = now.year();

        let tx = self.conn.transaction()?;
        let seq = allocate_display_seq(&tx, year)?;
        let entity = Entity {
            entity_id: Uuid::new_v4().to_string(),
            display_id: self.ids.format(year, seq),
            created_at: now,
        };
        tx.execute(
            r#"
            INSERT INTO entities (entity_id, display_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                entity.entity_id,
                entity.display_id,
                entity.created_at.to_rfc3339()
            ],
        )?;
        tx.commit()?;

        Ok(entity)
    }

    /// Resolves an entity reference (entity id or display id) to its
    /// entity id.
    pub fn resolve(&self, entity_ref: &str) -> Result<String> {
        self.conn
            .query_row(
                "SELECT entity_id FROM entities WHERE entity_id = ?1 OR display_id = ?1",
                params![entity_ref],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| MemoryError::EntityNotFound {
                entity_id: entity_ref.to_string(),
            })
    }

    /// Retrieves a specific entity by id.
    pub fn get_entity(&self, entity_id: &str) -> Result<Option<Entity>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT entity_id, display_id, created_at FROM entities WHERE entity_id = ?1",
                params![entity_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(row.map(|(entity_id, display_id, created_at)| {
            entity_from_row(entity_id, display_id, &created_at)
        }))
    }

    /// Lists all entities, oldest first.
    pub fn list_entities(&self) -> Result<Vec<Entity>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id, display_id, created_at FROM entities ORDER BY created_at, display_id",
        )?;

        let rows: Vec<(String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(entity_id, display_id, created_at)| {
                entity_from_row(entity_id, display_id, &created_at)
            })
            .collect())
    }

    /// Deletes an entity and its interaction log.
    ///
    /// The display id's sequence number is never given back.
    pub fn delete_entity(&mut self, entity_id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM entities WHERE entity_id = ?1",
            params![entity_id],
        )?;
        Ok(deleted > 0)
    }

    /// Reads an entity's interaction log as stored.
    ///
    /// Null or missing sequence columns read as empty; stored embeddings in
    /// a non-flat shape are normalized on the way out. Length divergence
    /// between the four sequences is tolerated with a warning — callers
    /// work with `aligned_len`.
    pub fn read_log(&self, entity_id: &str) -> Result<InteractionLog> {
        let row: Option<(
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        )> = self
            .conn
            .query_row(
                r#"
                SELECT input_conversation, output_conversation,
                       interaction_embeddings, interaction_metadata
                FROM entities
                WHERE entity_id = ?1
                "#,
                params![entity_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let (inputs_raw, outputs_raw, embeddings_raw, metadata_raw) =
            row.ok_or_else(|| MemoryError::EntityNotFound {
                entity_id: entity_id.to_string(),
            })?;

        let inputs: Vec<String> = parse_sequence(inputs_raw)?;
        let outputs: Vec<String> = parse_sequence(outputs_raw)?;
        let metadata: Vec<InteractionMeta> = parse_sequence(metadata_raw)?;
        let embedding_values: Vec<Value> = parse_sequence(embeddings_raw)?;
        let embeddings = embedding_values
            .iter()
            .map(ensure_vector)
            .collect::<Result<Vec<_>>>()?;

        let log = InteractionLog {
            inputs,
            outputs,
            embeddings,
            metadata,
        };
        if !log.is_aligned() {
            warn!(
                entity_id = %entity_id,
                inputs = log.inputs.len(),
                outputs = log.outputs.len(),
                embeddings = log.embeddings.len(),
                metadata = log.metadata.len(),
                "interaction log sequences have diverging lengths; using the shortest"
            );
        }

        Ok(log)
    }

    /// Appends one interaction to an entity's log in a single update.
    pub fn append_interaction(
        &mut self,
        entity_id: &str,
        input: &str,
        output: &str,
        user_id: &str,
        embedding: Vec<f32>,
    ) -> Result<()> {
        let mut log = self.read_log(entity_id)?;
        let basis_len = log.aligned_len();

        log.push(
            input.to_string(),
            output.to_string(),
            embedding,
            InteractionMeta::new(input, output, user_id),
        );

        self.check_for_lost_update(entity_id, basis_len);
        let updated = self.write_log(entity_id, &log)?;
        if !updated {
            // Entity vanished between read and write.
            return Err(MemoryError::EntityNotFound {
                entity_id: entity_id.to_string(),
            });
        }
        Ok(())
    }

    /// Removes the interaction at `index` from all four sequences.
    ///
    /// Returns whether the persisted write reported success.
    pub fn delete_interaction(&mut self, entity_id: &str, index: usize) -> Result<bool> {
        let mut log = self.read_log(entity_id)?;
        let basis_len = log.aligned_len();

        log.remove(index)?;

        self.check_for_lost_update(entity_id, basis_len);
        self.write_log(entity_id, &log)
    }

    /// Persists all four sequences as one UPDATE.
    fn write_log(&self, entity_id: &str, log: &InteractionLog) -> Result<bool> {
        let updated = self.conn.execute(
            r#"
            UPDATE entities SET
                input_conversation = ?2,
                output_conversation = ?3,
                interaction_embeddings = ?4,
                interaction_metadata = ?5
            WHERE entity_id = ?1
            "#,
            params![
                entity_id,
                serde_json::to_string(&log.inputs)?,
                serde_json::to_string(&log.outputs)?,
                serde_json::to_string(&log.embeddings)?,
                serde_json::to_string(&log.metadata)?,
            ],
        )?;
        Ok(updated == 1)
    }

    /// Best-effort lost-update detection right before a write.
    ///
    /// If the persisted length no longer matches the length this mutation
    /// was computed from, another writer got in between; the upcoming
    /// write clobbers theirs (last write wins). Failures here never mask
    /// the write path.
    fn check_for_lost_update(&self, entity_id: &str, basis_len: usize) {
        if let Ok(Some(current)) = self.stored_aligned_len(entity_id) {
            if current != basis_len {
                warn!(
                    entity_id = %entity_id,
                    read_len = basis_len,
                    stored_len = current,
                    "interaction log changed since it was read; last write wins"
                );
            }
        }
    }

    fn stored_aligned_len(&self, entity_id: &str) -> Result<Option<usize>> {
        let row: Option<(
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        )> = self
            .conn
            .query_row(
                r#"
                SELECT input_conversation, output_conversation,
                       interaction_embeddings, interaction_metadata
                FROM entities
                WHERE entity_id = ?1
                "#,
                params![entity_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((a, b, c, d)) = row else {
            return Ok(None);
        };
        let lens = [
            raw_sequence_len(a),
            raw_sequence_len(b),
            raw_sequence_len(c),
            raw_sequence_len(d),
        ];
        if lens.iter().any(|len| len.is_none()) {
            return Ok(None);
        }
        Ok(lens.iter().map(|len| len.unwrap_or(0)).min())
    }

    /// Counts stored entities.
    pub fn count_entities(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn allocate_display_seq(tx: &Transaction<'_>, year: i32) -> Result<u32> {
    let current: Option<u32> = tx
        .query_row(
            "SELECT next_seq FROM display_sequences WHERE year = ?1",
            params![year],
            |row| row.get(0),
        )
        .optional()?;

    match current {
        Some(seq) => {
            tx.execute(
                "UPDATE display_sequences SET next_seq = next_seq + 1 WHERE year = ?1",
                params![year],
            )?;
            Ok(seq)
        }
        None => {
            tx.execute(
                "INSERT INTO display_sequences (year, next_seq) VALUES (?1, 2)",
                params![year],
            )?;
            Ok(1)
        }
    }
}

fn entity_from_row(entity_id: String, display_id: String, created_at: &str) -> Entity {
    let created_at = match DateTime::parse_from_rfc3339(created_at) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            warn!(entity_id = %entity_id, error = %e, "unparseable created_at; falling back to epoch");
            DateTime::UNIX_EPOCH
        }
    };
    Entity {
        entity_id,
        display_id,
        created_at,
    }
}

fn parse_sequence<T: DeserializeOwned>(raw: Option<String>) -> Result<Vec<T>> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Some(raw) => Ok(serde_json::from_str(&raw)?),
    }
}

fn raw_sequence_len(raw: Option<String>) -> Option<usize> {
    match raw {
        None => Some(0),
        Some(raw) if raw.trim().is_empty() => Some(0),
        Some(raw) => serde_json::from_str::<Vec<Value>>(&raw)
            .ok()
            .map(|values| values.len()),
    }
}
