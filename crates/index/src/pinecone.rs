//! Pinecone REST client.
//!
//! `connect` makes sure the named serverless index exists (creating it with
//! cosine metric when missing) and waits for it to report ready. Chunks are
//! stored as vectors with their text and provenance in metadata.

use crate::embedder::Embedder;
use async_trait::async_trait;
use capstone_core::document::{DocumentChunk, ScoredChunk};
use capstone_core::error::IndexError;
use capstone_core::index::VectorIndex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
const READY_POLL_ATTEMPTS: u32 = 60;

/// Where and how to find (or create) the index.
#[derive(Debug, Clone)]
pub struct PineconeSettings {
    pub api_key: String,
    pub index_name: String,
    pub namespace: Option<String>,
    pub dimension: usize,
    pub cloud: String,
    pub region: String,
}

pub struct PineconeIndex {
    client: reqwest::Client,
    settings: PineconeSettings,
    host: String,
    embedder: Embedder,
}

impl PineconeIndex {
    /// Resolve the index host, creating the index first if it does not exist.
    pub async fn connect(settings: PineconeSettings, embedder: Embedder) -> Result<Self, IndexError> {
        if settings.api_key.trim().is_empty() {
            return Err(IndexError::NotConfigured("PINECONE_API_KEY is not set".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let mut index = Self {
            client,
            settings,
            host: String::new(),
            embedder,
        };

        let description = match index.describe().await? {
            Some(description) => description,
            None => {
                info!(index = %index.settings.index_name, dimension = index.settings.dimension, "Creating Pinecone index");
                index.create().await?;
                index.wait_until_ready().await?
            }
        };

        let description = if description.is_ready() {
            description
        } else {
            index.wait_until_ready().await?
        };

        index.host = normalize_host(&description.host);
        info!(index = %index.settings.index_name, host = %index.host, "Connected to Pinecone index");
        Ok(index)
    }

    fn control_url(&self, path: &str) -> String {
        format!("{CONTROL_PLANE_URL}{path}")
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.settings.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn describe(&self) -> Result<Option<IndexDescription>, IndexError> {
        let url = self.control_url(&format!("/indexes/{}", self.settings.index_name));
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| IndexError::Unreachable(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let description = response
            .json::<IndexDescription>()
            .await
            .map_err(|e| IndexError::Unreachable(format!("invalid index description: {e}")))?;
        Ok(Some(description))
    }

    async fn create(&self) -> Result<(), IndexError> {
        let body = serde_json::json!({
            "name": self.settings.index_name,
            "dimension": self.settings.dimension,
            "metric": "cosine",
            "spec": {
                "serverless": {
                    "cloud": self.settings.cloud,
                    "region": self.settings.region,
                }
            }
        });
        let response = self
            .request(reqwest::Method::POST, &self.control_url("/indexes"))
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Unreachable(e.to_string()))?;

        // Another process may have created it between describe and create
        if response.status().as_u16() == 409 {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<IndexDescription, IndexError> {
        for attempt in 1..=READY_POLL_ATTEMPTS {
            if let Some(description) = self.describe().await? {
                if description.is_ready() {
                    return Ok(description);
                }
            }
            debug!(attempt, index = %self.settings.index_name, "Waiting for Pinecone index to become ready");
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(IndexError::Unreachable(format!(
            "index '{}' not ready after {} polls",
            self.settings.index_name, READY_POLL_ATTEMPTS
        )))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<usize, IndexError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(texts).await?;

        let body = UpsertRequest {
            vectors: chunks
                .iter()
                .zip(embeddings)
                .map(|(chunk, values)| UpsertVector {
                    id: chunk.id.clone(),
                    values,
                    metadata: ChunkMetadata::from(chunk),
                })
                .collect(),
            namespace: self.settings.namespace.clone(),
        };

        let url = format!("{}/vectors/upsert", self.host);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Unreachable(e.to_string()))?;
        let response = check_status(response).await?;

        let upserted = response
            .json::<UpsertResponse>()
            .await
            .map(|r| r.upserted_count)
            .unwrap_or(chunks.len());
        debug!(upserted, "Pinecone upsert complete");
        Ok(upserted)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed_one(query).await?;
        let body = QueryRequest {
            vector,
            top_k: k,
            include_metadata: true,
            namespace: self.settings.namespace.clone(),
        };

        let url = format!("{}/query", self.host);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Unreachable(e.to_string()))?;
        let response = check_status(response).await?;

        let parsed = response
            .json::<QueryResponse>()
            .await
            .map_err(|e| IndexError::Unreachable(format!("invalid query response: {e}")))?;
        Ok(parsed.into_scored_chunks())
    }

    async fn count(&self) -> Result<Option<usize>, IndexError> {
        let url = format!("{}/describe_index_stats", self.host);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| IndexError::Unreachable(e.to_string()))?;
        let response = check_status(response).await?;
        let stats = response
            .json::<IndexStats>()
            .await
            .map_err(|e| IndexError::Unreachable(format!("invalid stats response: {e}")))?;
        Ok(Some(stats.total_vector_count))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body = %message, "Pinecone returned error");
    Err(IndexError::Rejected {
        status_code: status.as_u16(),
        message,
    })
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

// --- Pinecone API types (internal) ---

#[derive(Debug, Deserialize)]
struct IndexDescription {
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: Option<IndexStatus>,
}

impl IndexDescription {
    fn is_ready(&self) -> bool {
        !self.host.is_empty() && self.status.as_ref().is_some_and(|s| s.ready)
    }
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChunkMetadata {
    text: String,
    source: String,
    document_id: String,
    sequence: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
}

impl From<&DocumentChunk> for ChunkMetadata {
    fn from(chunk: &DocumentChunk) -> Self {
        Self {
            text: chunk.text.clone(),
            source: chunk.source.clone(),
            document_id: chunk.document_id.clone(),
            sequence: chunk.sequence,
            page: chunk.page,
        }
    }
}

#[derive(Debug, Serialize)]
struct UpsertVector {
    id: String,
    values: Vec<f32>,
    metadata: ChunkMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest {
    vectors: Vec<UpsertVector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    vector: Vec<f32>,
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}

impl QueryResponse {
    /// Matches without metadata cannot be shown to the model and are skipped.
    fn into_scored_chunks(self) -> Vec<ScoredChunk> {
        self.matches
            .into_iter()
            .filter_map(|m| {
                let meta = m.metadata?;
                Some(ScoredChunk {
                    chunk: DocumentChunk {
                        id: m.id,
                        document_id: meta.document_id,
                        source: meta.source,
                        page: meta.page,
                        sequence: meta.sequence,
                        text: meta.text,
                    },
                    score: m.score,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    #[serde(default)]
    total_vector_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_gets_scheme() {
        assert_eq!(normalize_host("idx-abc.svc.pinecone.io"), "https://idx-abc.svc.pinecone.io");
        assert_eq!(normalize_host("http://localhost:5080/"), "http://localhost:5080");
    }

    #[test]
    fn description_readiness() {
        let ready: IndexDescription =
            serde_json::from_str(r#"{"name":"i","host":"h.pinecone.io","status":{"ready":true,"state":"Ready"}}"#)
                .unwrap();
        assert!(ready.is_ready());

        let pending: IndexDescription =
            serde_json::from_str(r#"{"name":"i","host":"","status":{"ready":false,"state":"Initializing"}}"#).unwrap();
        assert!(!pending.is_ready());
    }

    #[test]
    fn query_request_uses_camel_case() {
        let body = serde_json::to_value(QueryRequest {
            vector: vec![0.1],
            top_k: 3,
            include_metadata: true,
            namespace: None,
        })
        .unwrap();
        assert_eq!(body["topK"], 3);
        assert_eq!(body["includeMetadata"], true);
        assert!(body.get("namespace").is_none());
    }

    #[test]
    fn metadata_omits_missing_page() {
        let chunk = DocumentChunk {
            id: "d-0".into(),
            document_id: "d".into(),
            source: "a.txt".into(),
            page: None,
            sequence: 0,
            text: "hello".into(),
        };
        let value = serde_json::to_value(ChunkMetadata::from(&chunk)).unwrap();
        assert!(value.get("page").is_none());
        assert_eq!(value["text"], "hello");
    }

    #[test]
    fn query_matches_become_chunks() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"matches":[
                {"id":"d-1","score":0.91,"metadata":{"text":"alpha","source":"a.pdf","document_id":"d","sequence":1,"page":2}},
                {"id":"orphan","score":0.5}
            ]}"#,
        )
        .unwrap();
        let hits = response.into_scored_chunks();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "alpha");
        assert_eq!(hits[0].chunk.page, Some(2));
        assert!((hits[0].score - 0.91).abs() < 1e-6);
    }

    #[test]
    fn empty_matches_are_normal() {
        let response: QueryResponse = serde_json::from_str(r#"{"matches":[],"namespace":""}"#).unwrap();
        assert!(response.into_scored_chunks().is_empty());
    }
}
