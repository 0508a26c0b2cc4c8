use super::ImageProvider;
use crate::{
    bedrock::ImageClient,
    error::{DeckError, Result, UpstreamCategory, UpstreamError},
    models::ImageLocation,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn no_result(provider: &str) -> DeckError {
    UpstreamError::new(
        UpstreamCategory::Unknown,
        format!("{} returned no image", provider),
    )
    .into()
}

async fn get_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await.map_err(UpstreamError::from)?;
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::from_http_status(status.as_u16(), format!("HTTP {}", status)).into());
    }
    Ok(response.json().await.map_err(UpstreamError::from)?)
}

async fn write_image(output_dir: &Path, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| DeckError::Internal(format!("cannot create {}: {}", output_dir.display(), e)))?;
    let path = output_dir.join(format!("{}.{}", Uuid::new_v4(), extension));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| DeckError::Internal(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(path)
}

fn pexels_url(data: &Value) -> Option<String> {
    data["photos"][0]["src"]["large"].as_str().map(String::from)
}

fn pixabay_url(data: &Value) -> Option<String> {
    data["hits"][0]["largeImageURL"].as_str().map(String::from)
}

pub struct PexelsProvider {
    http: Client,
    api_key: String,
}

impl PexelsProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl ImageProvider for PexelsProvider {
    fn name(&self) -> &str {
        "pexels"
    }

    fn is_stock(&self) -> bool {
        true
    }

    async fn fetch(&self, prompt: &str) -> Result<ImageLocation> {
        let request = self
            .http
            .get("https://api.pexels.com/v1/search")
            .query(&[("query", prompt), ("per_page", "1")])
            .header("Authorization", &self.api_key);
        let data = get_json(request).await?;
        pexels_url(&data)
            .map(ImageLocation::Url)
            .ok_or_else(|| no_result("Pexels"))
    }
}

pub struct PixabayProvider {
    http: Client,
    api_key: String,
}

impl PixabayProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl ImageProvider for PixabayProvider {
    fn name(&self) -> &str {
        "pixabay"
    }

    fn is_stock(&self) -> bool {
        true
    }

    async fn fetch(&self, prompt: &str) -> Result<ImageLocation> {
        let request = self.http.get("https://pixabay.com/api/").query(&[
            ("key", self.api_key.as_str()),
            ("q", prompt),
            ("image_type", "photo"),
            ("per_page", "3"),
        ]);
        let data = get_json(request).await?;
        pixabay_url(&data)
            .map(ImageLocation::Url)
            .ok_or_else(|| no_result("Pixabay"))
    }
}

/// DALL-E 3 through the OpenAI images API; the result is downloaded.
pub struct DallEProvider {
    http: Client,
    api_key: String,
    output_dir: PathBuf,
}

impl DallEProvider {
    pub fn new(api_key: String, output_dir: PathBuf) -> Self {
        Self {
            http: Client::new(),
            api_key,
            output_dir,
        }
    }
}

#[async_trait]
impl ImageProvider for DallEProvider {
    fn name(&self) -> &str {
        "dall-e-3"
    }

    fn is_stock(&self) -> bool {
        false
    }

    async fn fetch(&self, prompt: &str) -> Result<ImageLocation> {
        let request = self
            .http
            .post("https://api.openai.com/v1/images/generations")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": "dall-e-3",
                "prompt": prompt,
                "n": 1,
                "quality": "standard",
                "size": "1024x1024"
            }));
        let data = get_json(request).await?;
        let url = data["data"][0]["url"]
            .as_str()
            .ok_or_else(|| no_result("DALL-E"))?;

        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .map_err(UpstreamError::from)?
            .bytes()
            .await
            .map_err(UpstreamError::from)?;
        let path = write_image(&self.output_dir, "png", &bytes).await?;
        Ok(ImageLocation::File(path.to_string_lossy().into_owned()))
    }
}

/// Bedrock Titan image generator; base64 payload written to disk.
pub struct TitanProvider {
    client: ImageClient,
    output_dir: PathBuf,
}

impl TitanProvider {
    pub fn new(client: ImageClient, output_dir: PathBuf) -> Self {
        Self { client, output_dir }
    }
}

#[async_trait]
impl ImageProvider for TitanProvider {
    fn name(&self) -> &str {
        "titan"
    }

    fn is_stock(&self) -> bool {
        false
    }

    async fn fetch(&self, prompt: &str) -> Result<ImageLocation> {
        let encoded = self.client.generate(prompt).await?;
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| DeckError::Internal(format!("invalid base64 image: {}", e)))?;
        let path = write_image(&self.output_dir, "png", &bytes).await?;
        Ok(ImageLocation::File(path.to_string_lossy().into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_response_parsing() {
        let pexels = json!({"photos": [{"src": {"large": "https://images.pexels.com/1.jpg"}}]});
        assert_eq!(
            pexels_url(&pexels).as_deref(),
            Some("https://images.pexels.com/1.jpg")
        );
        assert_eq!(pexels_url(&json!({"photos": []})), None);

        let pixabay = json!({"hits": [{"largeImageURL": "https://pixabay.com/a.jpg"}]});
        assert_eq!(
            pixabay_url(&pixabay).as_deref(),
            Some("https://pixabay.com/a.jpg")
        );
    }

    #[tokio::test]
    async fn test_write_image_uses_unique_names() {
        let dir = std::env::temp_dir().join(format!("deckgen-test-{}", Uuid::new_v4()));
        let a = write_image(&dir, "png", b"one").await.unwrap();
        let b = write_image(&dir, "png", b"two").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(tokio::fs::read(&a).await.unwrap(), b"one");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
