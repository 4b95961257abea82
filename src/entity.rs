// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity records and display-id formatting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::IdsConfig;

/// A business object owning one interaction log.
///
/// `entity_id` is the opaque primary key (a UUID); `display_id` is the
/// human-facing sequential id shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub display_id: String,
    pub created_at: DateTime<Utc>,
}

/// Display-id scheme: `PREFIX-YYYY-TAG-NNNN`.
///
/// Sequence numbers are scoped per calendar year and allocated from a
/// persistent counter, so an id is never reused even after earlier
/// entities are deleted.
#[derive(Debug, Clone)]
pub struct IdFormat {
    pub prefix: String,
    pub tag: String,
}

impl Default for IdFormat {
    fn default() -> Self {
        Self {
            prefix: "ENT".to_string(),
            tag: "MEM".to_string(),
        }
    }
}

impl IdFormat {
    pub fn from_config(config: &IdsConfig) -> Self {
        Self {
            prefix: config.prefix().to_string(),
            tag: config.tag().to_string(),
        }
    }

    /// Formats a display id for the given year and sequence number.
    pub fn format(&self, year: i32, seq: u32) -> String {
        format!("{}-{}-{}-{:04}", self.prefix, year, self.tag, seq)
    }
}
