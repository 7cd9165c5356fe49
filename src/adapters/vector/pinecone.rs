//! Pinecone data-plane adapter.
//!
//! Talks to an existing serverless index over REST (`/vectors/upsert` and
//! `/query`). Index creation is left to the Pinecone console or CLI.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::VectorStoreConfig;
use crate::domain::ports::{QueryMatch, VectorRecord, VectorStore};

const API_VERSION: &str = "2024-07";

pub struct PineconeVectorStore {
    client: reqwest::Client,
    host: String,
    api_key: String,
}

impl PineconeVectorStore {
    /// Build from config. The key falls back to `PINECONE_API_KEY`; a
    /// missing key or index host is reported here rather than on first use.
    pub fn new(config: &VectorStoreConfig) -> DomainResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("PINECONE_API_KEY").ok())
            .ok_or_else(|| {
                DomainError::CollaboratorUnavailable(
                    "Pinecone API key not set. Set PINECONE_API_KEY or vector_store.api_key."
                        .to_string(),
                )
            })?;
        let host = config
            .index_host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| {
                DomainError::CollaboratorUnavailable(
                    "Pinecone index host not set. Configure vector_store.index_host.".to_string(),
                )
            })?;
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{host}")
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::CollaboratorUnavailable(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<B: Serialize + Sync, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> DomainResult<R> {
        let url = format!("{}{path}", self.host);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| DomainError::VectorStore(format!("Pinecone request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(DomainError::VectorStore(format!(
                "Pinecone returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DomainError::Serialization(format!("Failed to parse Pinecone response: {e}")))
    }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    fn name(&self) -> &'static str {
        "pinecone"
    }

    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> DomainResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        debug!(count = records.len(), namespace, "Upserting vectors");
        let response: UpsertResponse = self
            .post(
                "/vectors/upsert",
                &UpsertRequest {
                    vectors: records,
                    namespace,
                },
            )
            .await?;
        Ok(response.upserted_count)
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> DomainResult<Vec<QueryMatch>> {
        let response: QueryResponse = self
            .post(
                "/query",
                &QueryRequest {
                    vector,
                    top_k,
                    namespace,
                    include_metadata: true,
                },
            )
            .await?;
        Ok(response.matches)
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: Option<&str>, key: Option<&str>) -> VectorStoreConfig {
        VectorStoreConfig {
            api_key: key.map(str::to_string),
            index_host: host.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_host_is_reported_at_construction() {
        let err = PineconeVectorStore::new(&config(None, Some("k"))).err().unwrap();
        assert!(matches!(err, DomainError::CollaboratorUnavailable(_)));
    }

    #[test]
    fn test_missing_key_is_reported_at_construction() {
        temp_env::with_var_unset("PINECONE_API_KEY", || {
            let err = PineconeVectorStore::new(&config(Some("idx.pinecone.io"), None))
                .err()
                .unwrap();
            assert!(matches!(err, DomainError::CollaboratorUnavailable(_)));
        });
    }

    #[test]
    fn test_host_gets_scheme() {
        let store = PineconeVectorStore::new(&config(Some("idx.pinecone.io/"), Some("k"))).unwrap();
        assert_eq!(store.host, "https://idx.pinecone.io");
    }
}
