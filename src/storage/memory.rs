use crate::{
    error::Result,
    models::storage::{
        InsertResult, VectorInsert, VectorSearch, VectorSearchResponse, VectorSearchResult,
    },
    storage::traits::VectorStore,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredVector {
    id: String,
    vector: Vec<f32>,
    metadata: HashMap<String, Value>,
    content: Option<String>,
}

/// Process-local store; the fallback when no hosted index is configured.
#[derive(Default)]
pub struct InMemoryVectorStore {
    namespaces: RwLock<HashMap<String, Vec<StoredVector>>>,
}

const DEFAULT_NAMESPACE: &str = "";

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn upsert_batch(&self, records: Vec<VectorInsert>) -> Result<Vec<InsertResult>> {
        let mut namespaces = self.namespaces.write().await;
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let id = record.id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let namespace = record
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
            let entries = namespaces.entry(namespace).or_default();
            entries.retain(|entry| entry.id != id);
            entries.push(StoredVector {
                id: id.clone(),
                vector: record.vector,
                metadata: record.metadata,
                content: record.content,
            });
            results.push(InsertResult {
                id,
                success: true,
                message: None,
            });
        }
        Ok(results)
    }

    async fn search(&self, query: VectorSearch) -> Result<VectorSearchResponse> {
        let namespaces = self.namespaces.read().await;
        let namespace = query.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);

        let mut results: Vec<VectorSearchResult> = namespaces
            .get(namespace)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| VectorSearchResult {
                        id: entry.id.clone(),
                        score: cosine_similarity(&query.vector, &entry.vector),
                        metadata: entry.metadata.clone(),
                        content: if query.include_content {
                            entry.content.clone()
                        } else {
                            None
                        },
                    })
                    .collect()
            })
            .unwrap_or_default();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(query.limit);

        Ok(VectorSearchResponse {
            total: results.len(),
            results,
        })
    }

    async fn has_namespace(&self, namespace: &str) -> Result<bool> {
        Ok(self.namespaces.read().await.contains_key(namespace))
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(namespace: &str, id: &str, vector: Vec<f32>, content: &str) -> VectorInsert {
        VectorInsert {
            id: Some(id.to_string()),
            vector,
            metadata: HashMap::new(),
            content: Some(content.to_string()),
            namespace: Some(namespace.to_string()),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_ranks_within_namespace() {
        let store = InMemoryVectorStore::new();
        store
            .upsert_batch(vec![
                insert("docs-a", "1", vec![1.0, 0.0], "wind"),
                insert("docs-a", "2", vec![0.7, 0.7], "solar"),
                insert("docs-b", "3", vec![1.0, 0.0], "other deck"),
            ])
            .await
            .unwrap();

        let response = store
            .search(VectorSearch {
                vector: vec![1.0, 0.1],
                limit: 5,
                namespace: Some("docs-a".to_string()),
                include_content: true,
            })
            .await
            .unwrap();

        assert_eq!(response.total, 2);
        assert_eq!(response.results[0].content.as_deref(), Some("wind"));
        assert_eq!(response.results[1].content.as_deref(), Some("solar"));
    }

    #[tokio::test]
    async fn test_delete_namespace() {
        let store = InMemoryVectorStore::new();
        store
            .upsert_batch(vec![insert("docs-x", "1", vec![1.0], "x")])
            .await
            .unwrap();
        assert!(store.has_namespace("docs-x").await.unwrap());
        store.delete_namespace("docs-x").await.unwrap();
        assert!(!store.has_namespace("docs-x").await.unwrap());
    }
}
