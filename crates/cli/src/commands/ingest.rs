//! `capstone ingest`: Add a local document to the knowledge base.

use capstone_gateway::AppState;
use std::path::PathBuf;

pub async fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    if config.index.backend == "memory" {
        eprintln!("  Note: the in-memory index is discarded when this command exits.");
        eprintln!("        Set index.backend = \"pinecone\" to keep ingested documents.");
        eprintln!();
    }

    let state = AppState::from_config(&config).await?;
    let _event_logger = capstone_gateway::spawn_event_logger(&state.event_bus);

    println!("Ingesting {}", path.display());
    let chunks = state
        .pipeline
        .ingest_path(&path)
        .await
        .map_err(|e| format!("Error processing file: {e}"))?;
    println!("  Added {chunks} chunks to knowledge base.");

    Ok(())
}
