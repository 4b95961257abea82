// SPDX-License-Identifier: MIT OR Apache-2.0

//! recall - Interaction memory store with semantic retrieval
//!
//! An append-only, per-entity log of (input, output, embedding, metadata)
//! tuples, queried by embedding-similarity top-k search. The embedding
//! service and the rendering of results belong to callers; this crate owns
//! the log, its alignment invariants, and the ranking.

pub mod config;
pub mod embedding;
pub mod entity;
pub mod errors;
pub mod output;
pub mod rank;
pub mod store;
