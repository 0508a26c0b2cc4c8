use crate::{
    bedrock::text_client::map_sdk_error,
    error::{DeckError, Result, UpstreamCategory, UpstreamError},
    retrieval::Embedder,
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{primitives::Blob, Client};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize)]
struct CohereEmbeddingRequest {
    texts: Vec<String>,
    input_type: String,
}

#[derive(Debug, Deserialize)]
struct CohereEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct TitanEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Bedrock embeddings (Titan or Cohere), used to index uploaded documents.
#[derive(Clone)]
pub struct VectorClient {
    client: Client,
    model_id: String,
}

impl VectorClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            model_id: "amazon.titan-embed-text-v2:0".to_string(),
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    fn request_payload(&self, text: &str) -> Result<serde_json::Value> {
        match self.model_id.as_str() {
            id if id.starts_with("amazon.titan-embed") => Ok(json!({ "inputText": text })),
            id if id.starts_with("cohere.embed") => {
                let cohere_request = CohereEmbeddingRequest {
                    texts: vec![text.to_string()],
                    input_type: "search_document".to_string(),
                };
                Ok(serde_json::to_value(cohere_request)?)
            }
            _ => Err(DeckError::Config(format!(
                "Unsupported embedding model: {}",
                self.model_id
            ))),
        }
    }

    fn parse_embedding(&self, response_str: &str) -> Result<Vec<f32>> {
        let embedding = if self.model_id.starts_with("cohere.embed") {
            let cohere_response: CohereEmbeddingResponse = serde_json::from_str(response_str)?;
            cohere_response
                .embeddings
                .into_iter()
                .next()
                .unwrap_or_default()
        } else {
            let titan_response: TitanEmbeddingResponse = serde_json::from_str(response_str)?;
            titan_response.embedding
        };

        if embedding.is_empty() {
            return Err(UpstreamError::new(
                UpstreamCategory::Unknown,
                "Empty embedding returned",
            )
            .into());
        }
        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for VectorClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request_json = serde_json::to_string(&self.request_payload(text)?)?;
        log::debug!("Generating embedding with model: {}", self.model_id);

        let response = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(map_sdk_error)?;

        let response_str = String::from_utf8(response.body.into_inner())
            .map_err(|e| DeckError::Internal(format!("non UTF-8 embedding response: {}", e)))?;
        self.parse_embedding(&response_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_bedrockruntime::config::{BehaviorVersion, Region};

    fn client(model: &str) -> VectorClient {
        let conf = aws_sdk_bedrockruntime::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        VectorClient::new(Client::from_conf(conf)).with_model(model)
    }

    #[test]
    fn test_payload_per_model() {
        let titan = client("amazon.titan-embed-text-v2:0");
        assert_eq!(titan.request_payload("hi").unwrap()["inputText"], "hi");

        let cohere = client("cohere.embed-english-v3");
        let payload = cohere.request_payload("hi").unwrap();
        assert_eq!(payload["texts"][0], "hi");
        assert_eq!(payload["input_type"], "search_document");

        assert!(client("unknown.embed").request_payload("hi").is_err());
    }

    #[test]
    fn test_parse_embedding() {
        let titan = client("amazon.titan-embed-text-v2:0");
        assert_eq!(
            titan.parse_embedding(r#"{"embedding":[0.1,0.2]}"#).unwrap(),
            vec![0.1, 0.2]
        );
        assert!(titan.parse_embedding(r#"{"embedding":[]}"#).is_err());

        let cohere = client("cohere.embed-english-v3");
        assert_eq!(
            cohere.parse_embedding(r#"{"embeddings":[[1.0]]}"#).unwrap(),
            vec![1.0]
        );
    }
}
