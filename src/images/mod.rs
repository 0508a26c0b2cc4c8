pub mod providers;

use crate::{
    bedrock::BedrockClient,
    config::{BedrockConfig, ImageConfig, ImageProviderKind},
    error::Result,
    models::{ImageLocation, ImagePrompt},
};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub use providers::{DallEProvider, PexelsProvider, PixabayProvider, TitanProvider};

pub const PLACEHOLDER_IMAGE: &str = "/static/images/placeholder.jpg";

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Stock libraries are searched with the bare prompt, generators get
    /// the theme appended.
    fn is_stock(&self) -> bool;

    async fn fetch(&self, prompt: &str) -> Result<ImageLocation>;
}

/// Picks the configured provider once. `None` means placeholders only.
pub async fn provider_from_config(
    config: &ImageConfig,
    bedrock: &BedrockConfig,
) -> Result<Option<Arc<dyn ImageProvider>>> {
    let Some(kind) = config.provider else {
        log::info!("🖼️  No image provider configured, using placeholders");
        return Ok(None);
    };

    let missing_key = |name: &str| {
        log::warn!("⚠️  {} selected but no API key is set, using placeholders", name);
        Ok(None)
    };

    let provider: Arc<dyn ImageProvider> = match kind {
        ImageProviderKind::Pexels => match &config.pexels_api_key {
            Some(key) => Arc::new(PexelsProvider::new(key.clone())),
            None => return missing_key("Pexels"),
        },
        ImageProviderKind::Pixabay => match &config.pixabay_api_key {
            Some(key) => Arc::new(PixabayProvider::new(key.clone())),
            None => return missing_key("Pixabay"),
        },
        ImageProviderKind::DallE3 => match &config.openai_api_key {
            Some(key) => Arc::new(DallEProvider::new(key.clone(), config.output_dir.clone())),
            None => return missing_key("DALL-E 3"),
        },
        ImageProviderKind::Titan => {
            let bedrock = BedrockClient::new(bedrock.clone()).await?;
            Arc::new(TitanProvider::new(
                bedrock.image().clone(),
                config.output_dir.clone(),
            ))
        }
    };

    log::info!("🖼️  Image provider: {}", provider.name());
    Ok(Some(provider))
}

/// Resolves image prompts to something a slide can show. Never fails.
#[derive(Clone, Default)]
pub struct ImageGenerationService {
    provider: Option<Arc<dyn ImageProvider>>,
}

impl ImageGenerationService {
    pub fn new(provider: Option<Arc<dyn ImageProvider>>) -> Self {
        Self { provider }
    }

    pub async fn generate_image(&self, prompt: &ImagePrompt) -> ImageLocation {
        let Some(provider) = &self.provider else {
            return ImageLocation::Url(PLACEHOLDER_IMAGE.to_string());
        };

        let image_prompt = prompt.get_image_prompt(!provider.is_stock());
        log::debug!("Generating image with {} for '{}'", provider.name(), image_prompt);

        match provider.fetch(&image_prompt).await {
            Ok(ImageLocation::File(path)) if !Path::new(&path).exists() => {
                log::error!("❌ Image not found at {}", path);
                ImageLocation::Url(PLACEHOLDER_IMAGE.to_string())
            }
            Ok(location) => location,
            Err(e) => {
                log::error!("❌ Error generating image: {}", e);
                ImageLocation::Url(PLACEHOLDER_IMAGE.to_string())
            }
        }
    }
}

/// JSON pointers of every object carrying an `__image_prompt__`.
fn image_prompt_pointers(value: &Value, pointer: String, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.get("__image_prompt__").map_or(false, Value::is_string) {
                found.push(pointer.clone());
            }
            for (key, child) in map {
                let escaped = key.replace('~', "~0").replace('/', "~1");
                image_prompt_pointers(child, format!("{}/{}", pointer, escaped), found);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                image_prompt_pointers(child, format!("{}/{}", pointer, i), found);
            }
        }
        _ => {}
    }
}

/// Sets `__image_url__` next to every `__image_prompt__` in a slide body.
pub async fn fill_image_urls(content: &mut Value, service: &ImageGenerationService) {
    let mut pointers = Vec::new();
    image_prompt_pointers(content, String::new(), &mut pointers);

    let prompts: Vec<ImagePrompt> = pointers
        .iter()
        .filter_map(|p| content.pointer(p))
        .filter_map(|obj| obj["__image_prompt__"].as_str())
        .map(ImagePrompt::new)
        .collect();

    let locations =
        futures::future::join_all(prompts.iter().map(|p| service.generate_image(p))).await;

    for (pointer, location) in pointers.iter().zip(locations) {
        if let Some(Value::Object(obj)) = content.pointer_mut(pointer) {
            obj.insert(
                "__image_url__".to_string(),
                Value::String(location.as_str().to_string()),
            );
        }
    }
}
