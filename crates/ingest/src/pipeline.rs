//! Batched upsert of document chunks into the vector index.
//!
//! Chunks are written `batch_size` at a time. A failed batch waits
//! `retry_cooldown` and is retried exactly once; a second failure aborts the
//! whole ingestion and no later batch is attempted. Successful batches that
//! are followed by another batch wait `batch_cooldown` first.

use crate::splitter::RecursiveSplitter;
use capstone_core::document::{DocumentChunk, SourceDocument};
use capstone_core::error::IngestError;
use capstone_core::event::{DomainEvent, EventBus};
use capstone_core::index::VectorIndex;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Rate-limit discipline for index writes.
#[derive(Debug, Clone)]
pub struct BatchPolicy {
    pub batch_size: usize,
    pub retry_cooldown: Duration,
    pub batch_cooldown: Duration,
}

impl BatchPolicy {
    pub fn from_config(config: &capstone_config::IngestionConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            retry_cooldown: Duration::from_secs(config.retry_cooldown_secs),
            batch_cooldown: Duration::from_secs(config.batch_cooldown_secs),
        }
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            batch_size: 5,
            retry_cooldown: Duration::from_secs(30),
            batch_cooldown: Duration::from_secs(5),
        }
    }
}

pub struct IngestionPipeline {
    index: Arc<dyn VectorIndex>,
    splitter: RecursiveSplitter,
    policy: BatchPolicy,
    event_bus: Option<Arc<EventBus>>,
}

impl IngestionPipeline {
    pub fn new(index: Arc<dyn VectorIndex>, splitter: RecursiveSplitter, policy: BatchPolicy) -> Self {
        Self {
            index,
            splitter,
            policy,
            event_bus: None,
        }
    }

    pub fn from_config(config: &capstone_config::IngestionConfig, index: Arc<dyn VectorIndex>) -> Self {
        Self::new(
            index,
            RecursiveSplitter::new(config.chunk_size, config.chunk_overlap),
            BatchPolicy::from_config(config),
        )
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn policy(&self) -> &BatchPolicy {
        &self.policy
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    /// Chunk and store `document`, returning the number of chunks written.
    pub async fn ingest(&self, document: &SourceDocument) -> Result<usize, IngestError> {
        let chunks = self.splitter.split_document(document);
        let batches: Vec<&[DocumentChunk]> = chunks.chunks(self.policy.batch_size.max(1)).collect();
        let total = batches.len();

        info!(
            document_id = %document.id,
            filename = %document.filename,
            chunks = chunks.len(),
            batches = total,
            index = self.index.name(),
            "Ingesting document"
        );

        let mut queued = 0;
        for (i, batch) in batches.iter().enumerate() {
            let number = i + 1;
            if let Err(e) = self.upsert_with_retry(&document.id, number, total, batch).await {
                self.publish(DomainEvent::ErrorOccurred {
                    context: format!("ingest:{}", document.filename),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }
            queued += batch.len();

            self.publish(DomainEvent::BatchUpserted {
                document_id: document.id.clone(),
                batch: number,
                chunks: batch.len(),
                timestamp: Utc::now(),
            });

            if number < total {
                debug!(batch = number, cooldown_ms = self.policy.batch_cooldown.as_millis() as u64, "Batch cooldown");
                tokio::time::sleep(self.policy.batch_cooldown).await;
            }
        }

        info!(document_id = %document.id, chunks = queued, "Document ingested");
        self.publish(DomainEvent::DocumentIngested {
            document_id: document.id.clone(),
            filename: document.filename.clone(),
            chunks: queued,
            timestamp: Utc::now(),
        });
        Ok(queued)
    }

    async fn upsert_with_retry(
        &self,
        document_id: &str,
        number: usize,
        total: usize,
        batch: &[DocumentChunk],
    ) -> Result<(), IngestError> {
        let first = match self.index.upsert(batch).await {
            Ok(_) => return Ok(()),
            Err(e) => e,
        };

        warn!(
            batch = number,
            total,
            error = %first,
            cooldown_secs = self.policy.retry_cooldown.as_secs(),
            "Batch upsert failed, retrying once after cooldown"
        );
        self.publish(DomainEvent::BatchRetried {
            document_id: document_id.to_string(),
            batch: number,
            error_message: first.to_string(),
            timestamp: Utc::now(),
        });
        tokio::time::sleep(self.policy.retry_cooldown).await;

        self.index
            .upsert(batch)
            .await
            .map(|_| ())
            .map_err(|source| IngestError::BatchFailed {
                batch: number,
                total,
                attempts: 2,
                source,
            })
    }

    /// Read, decode, and ingest a local file.
    pub async fn ingest_path(&self, path: &Path) -> Result<usize, IngestError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        crate::decoder::DocumentFormat::from_filename(&filename)?;

        let bytes = tokio::fs::read(path).await?;
        let document = tokio::task::spawn_blocking(move || crate::decoder::load_document(&filename, &bytes))
            .await
            .map_err(|e| IngestError::Io(std::io::Error::other(e)))??;
        self.ingest(&document).await
    }
}
