use crate::{
    error::Result,
    models::storage::{InsertResult, VectorInsert, VectorSearch, VectorSearchResponse},
};
use async_trait::async_trait;

/// Namespaced vector storage. Each namespace holds one presentation's
/// document chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn backend_name(&self) -> &str;

    async fn upsert_batch(&self, records: Vec<VectorInsert>) -> Result<Vec<InsertResult>>;

    async fn search(&self, query: VectorSearch) -> Result<VectorSearchResponse>;

    async fn has_namespace(&self, namespace: &str) -> Result<bool>;

    async fn delete_namespace(&self, namespace: &str) -> Result<()>;
}
