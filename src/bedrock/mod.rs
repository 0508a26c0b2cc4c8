pub mod image_client;
pub mod text_client;
pub mod vector_client;

use crate::{config::BedrockConfig, error::Result};
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::Client;

pub use image_client::ImageClient;
pub use text_client::TextClient;
pub use vector_client::VectorClient;

/// One shared SDK client handed out as text, embedding and image clients.
#[derive(Clone)]
pub struct BedrockClient {
    text_client: TextClient,
    image_client: ImageClient,
    vector_client: VectorClient,
}

impl BedrockClient {
    pub async fn new(bedrock_config: BedrockConfig) -> Result<Self> {
        let region = aws_sdk_bedrockruntime::config::Region::new(
            bedrock_config
                .region
                .clone()
                .unwrap_or_else(|| "us-east-1".to_string()),
        );

        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&bedrock_config.access_key, &bedrock_config.secret_key)
        {
            aws_config::defaults(BehaviorVersion::latest())
                .credentials_provider(aws_sdk_bedrockruntime::config::Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "deckgen",
                ))
                .region(region)
                .load()
                .await
        } else {
            log::warn!("⚠️  No explicit AWS credentials, using the default credential chain");
            aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await
        };

        let client = Client::new(&aws_config);

        Ok(Self {
            text_client: TextClient::new(client.clone()),
            image_client: ImageClient::new(client.clone()),
            vector_client: VectorClient::new(client),
        })
    }

    pub fn text(&self) -> &TextClient {
        &self.text_client
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn vector(&self) -> &VectorClient {
        &self.vector_client
    }
}
