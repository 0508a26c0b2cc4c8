use crate::{
    bedrock::text_client::map_sdk_error,
    error::{DeckError, Result, UpstreamCategory, UpstreamError},
};
use aws_sdk_bedrockruntime::{primitives::Blob, Client};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct TitanImageResponse {
    images: Vec<String>,
}

/// Titan text-to-image. Returns the base64 image payload.
#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    model_id: String,
}

impl ImageClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            model_id: "amazon.titan-image-generator-v1".to_string(),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let request_payload = json!({
            "taskType": "TEXT_IMAGE",
            "textToImageParams": {
                "text": prompt,
            },
            "imageGenerationConfig": {
                "numberOfImages": 1,
                "width": 1024,
                "height": 1024,
                "quality": "standard",
                "cfgScale": 8.0
            }
        });
        let request_json = serde_json::to_string(&request_payload)?;

        log::info!("Generating image with model: {}", self.model_id);

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
            .map_err(|e| DeckError::Internal(format!("non UTF-8 image response: {}", e)))?;
        let titan_response: TitanImageResponse = serde_json::from_str(&response_str)?;

        titan_response.images.into_iter().next().ok_or_else(|| {
            UpstreamError::new(UpstreamCategory::Unknown, "No images generated").into()
        })
    }
}
