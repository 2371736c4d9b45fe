use crate::config::Config;
use crate::error::{ApiError, Result};
use log::{debug, warn};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Output dimension of the sentence-transformer backing model
/// (all-MiniLM-L6-v2). Every stored `caption_embedding` has this length.
pub const EMBEDDING_DIMENSION: usize = 384;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_CONNECTION_TIMEOUT_SECONDS: u64 = 15;
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 500;

/// Gateway to the hosted text embedding model.
///
/// Wraps the HuggingFace Inference API feature-extraction endpoint and
/// returns unit-normalized vectors of a fixed dimension. Constructed once at
/// startup and shared as a cheap clone across requests.
#[derive(Clone)]
pub struct TextEmbedder {
    client: Client,
    api_key: String,
    model_url: String,
    model_name: String,
}

impl TextEmbedder {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECONDS))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        let model_url = format!(
            "{}/models/{}",
            config.huggingface_base_url, config.embedding_model
        );

        Ok(Self {
            client,
            api_key: config.huggingface_api_key.clone(),
            model_url,
            model_name: config.embedding_model.clone(),
        })
    }

    pub fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    /// Encodes a text into a unit-normalized embedding vector.
    ///
    /// Empty input is substituted with a placeholder so the call always
    /// yields a vector; inference failures surface as `EmbeddingFailure`
    /// after bounded retries.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = preprocess_text(text);
        debug!("Encoding text (length {}): {}", input.len(), input);

        let mut last_error = ApiError::EmbeddingFailure("no attempts made".to_string());
        for attempt in 1..=RETRY_ATTEMPTS {
            match self.request_embedding(&input).await {
                Ok(raw) => return self.finish_embedding(raw),
                Err(e) => {
                    if attempt < RETRY_ATTEMPTS {
                        warn!(
                            "Embedding request failed (attempt {}/{}): {}. Retrying...",
                            attempt, RETRY_ATTEMPTS, e
                        );
                        tokio::time::sleep(Duration::from_millis(
                            RETRY_DELAY_MS * 2u64.pow(attempt - 1),
                        ))
                        .await;
                    }
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn request_embedding(&self, input: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct Request<'a> {
            inputs: &'a str,
            options: Options,
        }

        #[derive(Serialize)]
        struct Options {
            wait_for_model: bool,
            use_cache: bool,
        }

        let request = Request {
            inputs: input,
            options: Options {
                wait_for_model: true,
                use_cache: true,
            },
        };

        let response = self
            .client
            .post(&self.model_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ApiError::EmbeddingFailure(format!("Failed to reach model API: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 => ApiError::EmbeddingFailure(format!("Model not found: {}", self.model_name)),
                401 | 403 => ApiError::EmbeddingFailure(
                    "Authentication failed for the model API".to_string(),
                ),
                429 => ApiError::EmbeddingFailure("Model API rate limit exceeded".to_string()),
                _ => ApiError::EmbeddingFailure(format!(
                    "Model API returned status {}: {}",
                    status, text
                )),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::EmbeddingFailure(format!("Invalid model response: {}", e)))?;

        parse_embedding(&body)
            .ok_or_else(|| ApiError::EmbeddingFailure("No embedding in model response".to_string()))
    }

    fn finish_embedding(&self, raw: Vec<f32>) -> Result<Vec<f32>> {
        if raw.len() != EMBEDDING_DIMENSION {
            return Err(ApiError::EmbeddingFailure(format!(
                "Unexpected embedding dimension {} (expected {})",
                raw.len(),
                EMBEDDING_DIMENSION
            )));
        }
        Ok(normalize(&raw))
    }
}

/// The inference API serves embeddings either as `[[f32]]` (batched) or
/// `[f32]` depending on the pipeline; accept both.
fn parse_embedding(body: &serde_json::Value) -> Option<Vec<f32>> {
    let array = body.as_array()?;
    let source = match array.first() {
        Some(first) if first.is_array() => first.as_array()?,
        _ => array,
    };
    let embedding: Vec<f32> = source
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();
    if embedding.is_empty() {
        None
    } else {
        Some(embedding)
    }
}

fn preprocess_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "empty text".to_string();
    }
    trimmed.to_string()
}

/// L2-normalize so cosine similarity reduces to inner product in the index.
fn normalize(embedding: &[f32]) -> Vec<f32> {
    let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return embedding.to_vec();
    }
    embedding.iter().map(|x| x / norm).collect()
}
