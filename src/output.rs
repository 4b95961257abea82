// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output and color utilities for consistent terminal formatting
//!
//! Text rendering for entities, logs, and ranked results, plus shared
//! color helpers respecting the NO_COLOR environment variable.

use colored::Colorize;
use serde_json::json;

use crate::entity::Entity;
use crate::errors::Result;
use crate::store::{InteractionLog, InteractionMeta};

/// Check if colors should be used (respects NO_COLOR env var)
pub fn use_colors() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Colorize a display id (cyan)
fn colorize_id(text: &str, use_color: bool) -> String {
    if use_color {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize a row index (yellow)
fn colorize_index(index: usize, use_color: bool) -> String {
    if use_color {
        index.to_string().yellow().to_string()
    } else {
        index.to_string()
    }
}

/// Colorize a similarity score (green bold)
fn colorize_score(score: f32, use_color: bool) -> String {
    let text = format!("{score:.4}");
    if use_color {
        text.green().bold().to_string()
    } else {
        text
    }
}

/// Colorize secondary detail (dimmed)
fn colorize_detail(text: &str, use_color: bool) -> String {
    if use_color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// Print one entity as text or JSON.
pub fn print_entity(entity: &Entity, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(entity)?);
        return Ok(());
    }

    let use_color = use_colors();
    println!(
        "{}  {}  {}",
        colorize_id(&entity.display_id, use_color),
        entity.entity_id,
        colorize_detail(&entity.created_at.to_rfc3339(), use_color),
    );
    Ok(())
}

/// Print an entity listing.
pub fn print_entities(entities: &[Entity], json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(entities)?);
        return Ok(());
    }

    if entities.is_empty() {
        println!("No entities.");
        return Ok(());
    }
    for entity in entities {
        print_entity(entity, false)?;
    }
    Ok(())
}

/// Print an interaction log, one row per interaction.
pub fn print_log(log: &InteractionLog, json_output: bool) -> Result<()> {
    if json_output {
        let rows: Vec<_> = log
            .rows()
            .map(|row| {
                json!({
                    "index": row.index,
                    "input": row.input,
                    "output": row.output,
                    "timestamp": row.meta.timestamp,
                    "user_id": row.meta.user_id,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if log.is_empty() {
        println!("No interactions.");
        return Ok(());
    }

    let use_color = use_colors();
    for row in log.rows() {
        println!(
            "[{}] {}",
            colorize_index(row.index, use_color),
            colorize_detail(
                &format!("{} · {}", row.meta.timestamp.to_rfc3339(), row.meta.user_id),
                use_color
            ),
        );
        println!("  > {}", row.input);
        println!("  < {}", row.output);
    }
    Ok(())
}

/// Print ranked recall results, best match first.
pub fn print_ranked(results: &[InteractionMeta], json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matching interactions.");
        return Ok(());
    }

    let use_color = use_colors();
    for meta in results {
        let score = meta.similarity.unwrap_or(0.0);
        println!(
            "{}  {}",
            colorize_score(score, use_color),
            colorize_detail(&meta.timestamp.to_rfc3339(), use_color),
        );
        println!("  > {}", meta.input);
        println!("  < {}", meta.output);
    }
    Ok(())
}
