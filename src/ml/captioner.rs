use crate::config::Config;
use crate::error::{ApiError, Result};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Client for the hosted image captioning model (FashionBLIP).
///
/// Downloads the image and forwards the raw bytes to the inference endpoint.
/// Stored image URLs are handed out presigned, so a plain GET covers both
/// public and private objects.
#[derive(Clone)]
pub struct Captioner {
    client: Client,
    api_key: String,
    model_url: String,
}

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    generated_text: String,
}

impl Captioner {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        let model_url = format!(
            "{}/models/{}",
            config.huggingface_base_url, config.caption_model
        );

        Ok(Self {
            client,
            api_key: config.huggingface_api_key.clone(),
            model_url,
        })
    }

    /// Generates a caption for the clothing image behind `image_url`.
    pub async fn caption(&self, image_url: &str) -> Result<String> {
        debug!("Captioning image: {}", image_url);
        let image_bytes = self.download_image(image_url).await?;

        let response = self
            .client
            .post(&self.model_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/octet-stream")
            .body(image_bytes)
            .send()
            .await
            .map_err(|e| {
                ApiError::CaptioningFailure(format!("Failed to reach caption model: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::CaptioningFailure(format!(
                "Caption model returned status {}: {}",
                status, text
            )));
        }

        let captions: Vec<CaptionResponse> = response.json().await.map_err(|e| {
            ApiError::CaptioningFailure(format!("Invalid caption model response: {}", e))
        })?;

        let caption = captions
            .into_iter()
            .next()
            .map(|c| c.generated_text)
            .ok_or_else(|| {
                ApiError::CaptioningFailure("Caption model returned no candidates".to_string())
            })?;

        info!("Generated caption: {}", caption);
        Ok(caption)
    }

    async fn download_image(&self, image_url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(image_url).send().await.map_err(|e| {
            ApiError::CaptioningFailure(format!("Failed to download image from URL: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(ApiError::CaptioningFailure(format!(
                "Failed to download image from URL: status {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            ApiError::CaptioningFailure(format!("Failed to read image bytes: {}", e))
        })?;

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::CaptioningFailure(format!(
                "Image too large: {} bytes",
                bytes.len()
            )));
        }

        Ok(bytes.to_vec())
    }
}
