use std::collections::HashMap;

use crate::{
    config::UpstashConfig,
    error::{DeckError, Result, RetrievalError},
    models::storage::{
        InsertResult, VectorInsert, VectorSearch, VectorSearchResponse, VectorSearchResult,
    },
    storage::traits::VectorStore,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use uuid::Uuid;

fn query_failed(message: impl Into<String>) -> DeckError {
    DeckError::Retrieval(RetrievalError::QueryFailed(message.into()))
}

/// Upstash Vector over its REST API, one Upstash namespace per collection.
pub struct UpstashVectorStore {
    client: Client,
    base_url: String,
    token: String,
}

impl UpstashVectorStore {
    pub async fn new(config: UpstashConfig) -> Result<Self> {
        let base_url = config
            .url
            .ok_or_else(|| DeckError::Config("Upstash URL is required".into()))?;

        let token = config
            .token
            .ok_or_else(|| DeckError::Config("Upstash token is required".into()))?;

        let storage = Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        };

        if !storage.health_check().await? {
            return Err(DeckError::Config("Upstash index is not reachable".into()));
        }

        Ok(storage)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| query_failed(format!("Upstash request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| query_failed(format!("Failed to parse Upstash response: {}", e)))?;

        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("unknown error");
            return Err(query_failed(format!("Upstash returned {}: {}", status, message)));
        }
        Ok(body)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .get("info")
            .send()
            .await
            .map_err(|e| query_failed(format!("Health check failed: {}", e)))?;
        Ok(response.status().is_success())
    }
}

fn upsert_body(records: &[VectorInsert]) -> (Vec<Value>, Vec<String>) {
    let mut ids = Vec::with_capacity(records.len());
    let vectors = records
        .iter()
        .map(|record| {
            let id = record
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            ids.push(id.clone());

            let mut metadata = record.metadata.clone();
            if let Some(content) = &record.content {
                metadata.insert("content".to_string(), json!(content));
            }
            metadata.insert("created_at".to_string(), json!(Utc::now().to_rfc3339()));

            json!({
                "id": id,
                "vector": record.vector,
                "metadata": metadata
            })
        })
        .collect();
    (vectors, ids)
}

fn search_result(hit: &Value, include_content: bool) -> VectorSearchResult {
    let metadata: HashMap<String, Value> = hit["metadata"]
        .as_object()
        .map(|m| m.clone().into_iter().collect())
        .unwrap_or_default();
    let content = if include_content {
        metadata
            .get("content")
            .and_then(|c| c.as_str())
            .map(String::from)
    } else {
        None
    };

    VectorSearchResult {
        id: hit["id"].as_str().unwrap_or_default().to_string(),
        score: hit["score"].as_f64().unwrap_or(0.0) as f32,
        metadata,
        content,
    }
}

#[async_trait]
impl VectorStore for UpstashVectorStore {
    fn backend_name(&self) -> &str {
        "upstash"
    }

    async fn upsert_batch(&self, records: Vec<VectorInsert>) -> Result<Vec<InsertResult>> {
        let mut by_namespace: HashMap<String, Vec<VectorInsert>> = HashMap::new();
        for record in records {
            let namespace = record.namespace.clone().unwrap_or_default();
            by_namespace.entry(namespace).or_default().push(record);
        }

        let mut results = Vec::new();
        for (namespace, records) in by_namespace {
            let (vectors, ids) = upsert_body(&records);
            self.send_json(self.post(&format!("upsert/{}", namespace)).json(&vectors))
                .await?;
            log::debug!("📦 Upserted {} vectors into '{}'", ids.len(), namespace);

            results.extend(ids.into_iter().map(|id| InsertResult {
                id,
                success: true,
                message: None,
            }));
        }
        Ok(results)
    }

    async fn search(&self, query: VectorSearch) -> Result<VectorSearchResponse> {
        let namespace = query.namespace.clone().unwrap_or_default();
        let payload = json!({
            "vector": query.vector,
            "topK": query.limit,
            "includeMetadata": true,
        });

        let body = self
            .send_json(self.post(&format!("query/{}", namespace)).json(&payload))
            .await?;

        let results: Vec<VectorSearchResult> = body["result"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .map(|hit| search_result(hit, query.include_content))
                    .collect()
            })
            .unwrap_or_default();

        Ok(VectorSearchResponse {
            total: results.len(),
            results,
        })
    }

    async fn has_namespace(&self, namespace: &str) -> Result<bool> {
        let body = self.send_json(self.get("list-namespaces")).await?;
        Ok(body["result"]
            .as_array()
            .map(|names| names.iter().any(|n| n.as_str() == Some(namespace)))
            .unwrap_or(false))
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/delete-namespace/{}", self.base_url, namespace))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| query_failed(format!("Upstash delete failed: {}", e)))?;

        if !response.status().is_success() {
            log::warn!(
                "⚠️  Could not delete namespace '{}': {}",
                namespace,
                response.status()
            );
        }
        Ok(())
    }
}
