pub mod splitter;

use crate::{
    config::RetrievalConfig,
    error::{DeckError, Result, RetrievalError},
    models::storage::{VectorInsert, VectorSearch},
    storage::VectorStore,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub use splitter::TextSplitter;

/// Joins retrieved snippets in prompts.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Snippets most relevant to `query`, best first. May be empty.
    async fn retrieve(&self, query: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Retrieved context for `query`, or an empty string. Never fails.
pub async fn gather_context(retriever: Option<&dyn Retriever>, query: &str) -> String {
    let Some(retriever) = retriever else {
        return String::new();
    };

    match retriever.retrieve(query).await {
        Ok(snippets) => snippets
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR),
        Err(DeckError::Retrieval(RetrievalError::NotIndexed(collection))) => {
            log::debug!("No documents indexed in '{}', continuing without context", collection);
            String::new()
        }
        Err(e) => {
            log::warn!("⚠️  Retrieval failed, continuing without context: {}", e);
            String::new()
        }
    }
}

fn query_failed(e: DeckError) -> DeckError {
    match e {
        DeckError::Retrieval(_) => e,
        other => DeckError::Retrieval(RetrievalError::QueryFailed(other.to_string())),
    }
}

/// Per-presentation document collections: chunk, embed, store, query, drop.
#[derive(Clone)]
pub struct DocumentIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
    top_k: usize,
    collection_prefix: String,
}

impl DocumentIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self::from_config(embedder, store, &RetrievalConfig::default())
    }

    pub fn from_config(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap),
            top_k: config.top_k,
            collection_prefix: config.collection_prefix.clone(),
        }
    }

    pub fn collection_name(&self, presentation_id: &Uuid) -> String {
        format!("{}-{}", self.collection_prefix, presentation_id)
    }

    /// Chunks and stores `texts`; returns the number of chunks written.
    pub async fn index(&self, presentation_id: &Uuid, texts: &[String]) -> Result<usize> {
        let collection = self.collection_name(presentation_id);
        let mut records = Vec::new();

        for (document_index, text) in texts.iter().enumerate() {
            for (chunk_index, chunk) in self.splitter.split(text).into_iter().enumerate() {
                let vector = self.embedder.embed(&chunk).await.map_err(query_failed)?;
                let mut metadata = HashMap::new();
                metadata.insert("presentation_id".to_string(), json!(presentation_id));
                metadata.insert("document_index".to_string(), json!(document_index));
                metadata.insert("chunk_index".to_string(), json!(chunk_index));

                records.push(VectorInsert {
                    id: None,
                    vector,
                    metadata,
                    content: Some(chunk),
                    namespace: Some(collection.clone()),
                });
            }
        }

        if records.is_empty() {
            return Ok(0);
        }

        let count = records.len();
        self.store.upsert_batch(records).await.map_err(query_failed)?;
        log::info!(
            "📚 Indexed {} chunks from {} documents into '{}'",
            count,
            texts.len(),
            collection
        );
        Ok(count)
    }

    pub fn retriever(&self, presentation_id: &Uuid) -> CollectionRetriever {
        CollectionRetriever {
            embedder: self.embedder.clone(),
            store: self.store.clone(),
            collection: self.collection_name(presentation_id),
            top_k: self.top_k,
        }
    }

    pub async fn cleanup(&self, presentation_id: &Uuid) -> Result<()> {
        let collection = self.collection_name(presentation_id);
        self.store.delete_namespace(&collection).await?;
        log::debug!("🧹 Dropped collection '{}'", collection);
        Ok(())
    }
}

/// Queries one presentation's collection.
#[derive(Clone)]
pub struct CollectionRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
    top_k: usize,
}

impl CollectionRetriever {
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl Retriever for CollectionRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<String>> {
        if !self
            .store
            .has_namespace(&self.collection)
            .await
            .map_err(query_failed)?
        {
            return Err(RetrievalError::NotIndexed(self.collection.clone()).into());
        }

        let vector = self.embedder.embed(query).await.map_err(query_failed)?;
        let response = self
            .store
            .search(VectorSearch {
                vector,
                limit: self.top_k,
                namespace: Some(self.collection.clone()),
                include_content: true,
            })
            .await
            .map_err(query_failed)?;

        Ok(response
            .results
            .into_iter()
            .filter_map(|result| result.content)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{UpstreamCategory, UpstreamError};
    use crate::storage::InMemoryVectorStore;

    /// Bag-of-letters embedding: enough to rank by shared vocabulary.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut vector = vec![0.0; 26];
            for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                vector[(c as u8 - b'a') as usize] += 1.0;
            }
            Ok(vector)
        }
    }

    struct FailingRetriever;

    #[async_trait]
    impl Retriever for FailingRetriever {
        async fn retrieve(&self, _query: &str) -> Result<Vec<String>> {
            Err(UpstreamError::new(UpstreamCategory::Network, "timeout").into())
        }
    }

    struct FixedRetriever(Vec<&'static str>);

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn retrieve(&self, _query: &str) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    fn index() -> DocumentIndex {
        DocumentIndex::new(Arc::new(LetterEmbedder), Arc::new(InMemoryVectorStore::new()))
    }

    #[tokio::test]
    async fn test_index_then_retrieve() {
        let index = index();
        let id = Uuid::new_v4();
        let written = index
            .index(
                &id,
                &[
                    "zebra zoo zigzag".to_string(),
                    "apple banana".to_string(),
                ],
            )
            .await
            .unwrap();
        assert_eq!(written, 2);

        let snippets = index.retriever(&id).retrieve("zoo zebra").await.unwrap();
        assert_eq!(snippets[0], "zebra zoo zigzag");
        assert_eq!(index.retriever(&id).collection(), format!("docs-{}", id));
    }

    #[tokio::test]
    async fn test_unindexed_collection_is_distinguished() {
        let index = index();
        let err = index
            .retriever(&Uuid::new_v4())
            .retrieve("anything")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeckError::Retrieval(RetrievalError::NotIndexed(_))
        ));
    }

    #[tokio::test]
    async fn test_cleanup_drops_collection() {
        let index = index();
        let id = Uuid::new_v4();
        index.index(&id, &["some text".to_string()]).await.unwrap();
        index.cleanup(&id).await.unwrap();
        assert!(index.retriever(&id).retrieve("text").await.is_err());
    }

    #[tokio::test]
    async fn test_gather_context_never_fails() {
        assert_eq!(gather_context(None, "q").await, "");
        assert_eq!(gather_context(Some(&FailingRetriever), "q").await, "");
        assert_eq!(
            gather_context(Some(&FixedRetriever(vec!["a", " ", "b"])), "q").await,
            "a\n\n---\n\nb"
        );
    }
}
