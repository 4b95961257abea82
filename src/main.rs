// SPDX-License-Identifier: MIT OR Apache-2.0

//! recall - Interaction memory with semantic retrieval
//!
//! Thin driver over the library: every subcommand maps onto one store or
//! ranker operation and renders the result.

mod cli;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands, OutputFormat};
use tracing_subscriber::EnvFilter;

use recall::config::{Config, ConfigOutputFormat};
use recall::embedding::create_embedder;
use recall::output;
use recall::store::{EntityStore, InteractionStore};

fn main() -> Result<()> {
    // Initialize tracing with RECALL_LOG env var (e.g., RECALL_LOG=debug recall ask ...)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RECALL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let root = PathBuf::from(cli.path.as_deref().unwrap_or("."));
    let config = Config::load_at(&root);

    let json_output = match cli.format {
        Some(OutputFormat::Json) => true,
        Some(OutputFormat::Text) => false,
        None => matches!(config.output_format(), Some(ConfigOutputFormat::Json)),
    };

    match cli.command {
        Commands::Create => {
            let mut store = EntityStore::from_config(&root, &config)?;
            let entity = store.create_entity()?;
            output::print_entity(&entity, json_output)?;
        }
        Commands::List => {
            let store = EntityStore::from_config(&root, &config)?;
            output::print_entities(&store.list_entities()?, json_output)?;
        }
        Commands::Show { entity } => {
            let store = EntityStore::from_config(&root, &config)?;
            let entity_id = store.resolve(&entity)?;
            output::print_log(&store.read_log(&entity_id)?, json_output)?;
        }
        Commands::Add {
            entity,
            input,
            output: response,
            user,
        } => {
            let mut store = open_memory(&root, &config)?;
            let entity_id = store.resolve(&entity)?;
            store.append(&entity_id, &input, &response, &user)?;
            if !json_output {
                println!("Stored interaction for {entity}.");
            }
        }
        Commands::Forget { entity, index } => {
            let mut store = EntityStore::from_config(&root, &config)?;
            let entity_id = store.resolve(&entity)?;
            store.delete_interaction(&entity_id, index)?;
            if !json_output {
                println!("Deleted interaction {index} of {entity}.");
            }
        }
        Commands::Ask { entity, query, top } => {
            let store = open_memory(&root, &config)?;
            let entity_id = store.resolve(&entity)?;
            let results = store.recall(&entity_id, &query, top)?;
            output::print_ranked(&results, json_output)?;
        }
        Commands::Remove { entity } => {
            let mut store = EntityStore::from_config(&root, &config)?;
            let entity_id = store.resolve(&entity)?;
            store.delete_entity(&entity_id)?;
            if !json_output {
                println!("Deleted entity {entity}.");
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "recall", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Opens the full interaction store, embedder included. Only the commands
/// that actually embed (`add`, `ask`) pay for provider construction.
fn open_memory(root: &Path, config: &Config) -> Result<InteractionStore> {
    let store = EntityStore::from_config(root, config)?;
    let embedder = create_embedder(config)?;
    Ok(InteractionStore::new(store, embedder))
}
