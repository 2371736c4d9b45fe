use anyhow::{anyhow, Result};
use std::env;

const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_CAPTION_MODEL: &str = "rcfg/FashionBLIP-1";
const DEFAULT_HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mongo_url: String,
    pub mongo_database: String,
    pub huggingface_api_key: String,
    pub huggingface_base_url: String,
    pub embedding_model: String,
    pub caption_model: String,
    pub vector_index: String,
    pub search_top_k: usize,
    pub signed_url_ttl_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            mongo_url: required("MONGO_URL")?,
            mongo_database: env::var("MONGO_DATABASE").unwrap_or_else(|_| "fabrecsai".to_string()),
            huggingface_api_key: required("APP_HUGGINGFACE_API_KEY")?,
            huggingface_base_url: env::var("APP_HUGGINGFACE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_HUGGINGFACE_BASE_URL.to_string()),
            embedding_model: env::var("APP_HUGGINGFACE_MODEL_NAME")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            caption_model: env::var("APP_CAPTION_MODEL_NAME")
                .unwrap_or_else(|_| DEFAULT_CAPTION_MODEL.to_string()),
            vector_index: env::var("APP_VECTOR_INDEX")
                .unwrap_or_else(|_| "vector_index".to_string()),
            search_top_k: env::var("APP_SEARCH_TOP_K")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            signed_url_ttl_secs: env::var("APP_SIGNED_URL_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| anyhow!("{} must be set", name))
}
