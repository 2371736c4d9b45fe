use crate::error::{ApiError, Result};
use aws_sdk_s3::presigning::PresigningConfig;
use log::debug;
use std::time::Duration;
use url::Url;

/// Issues short-lived signed GET URLs for stored wardrobe images.
///
/// Signing is local to the SDK, so `resolve_signed_urls` is one logical
/// batch operation per search rather than a network round-trip per result.
#[derive(Clone)]
pub struct StorageClient {
    client: aws_sdk_s3::Client,
    ttl: Duration,
}

impl StorageClient {
    pub async fn from_env(signed_url_ttl_secs: u64) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_s3::Client::new(&aws_config),
            ttl: Duration::from_secs(signed_url_ttl_secs),
        }
    }

    /// Resolves every URL into a client-usable one, order-preserving and
    /// same-length as the input. Any individual failure fails the batch:
    /// a partial result would silently misalign URLs with their items.
    pub async fn resolve_signed_urls(&self, urls: &[String]) -> Result<Vec<String>> {
        let mut signed = Vec::with_capacity(urls.len());
        for url in urls {
            signed.push(self.sign_url(url).await?);
        }
        Ok(signed)
    }

    async fn sign_url(&self, raw_url: &str) -> Result<String> {
        let Some((bucket, key)) = parse_s3_url(raw_url) else {
            // Not an object-storage reference; hand it back untouched so
            // externally hosted images keep working.
            debug!("URL is not S3-addressed, returning as-is: {}", raw_url);
            return Ok(raw_url.to_string());
        };

        let presigning = PresigningConfig::expires_in(self.ttl)
            .map_err(|e| ApiError::UrlResolutionFailure(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| ApiError::UrlResolutionFailure(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

/// Extracts `(bucket, key)` from an S3 URL. Supports virtual-hosted style
/// (`https://bucket.s3.region.amazonaws.com/key`) and path style
/// (`https://s3.region.amazonaws.com/bucket/key`).
fn parse_s3_url(raw: &str) -> Option<(String, String)> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    if !host.ends_with(".amazonaws.com") {
        return None;
    }

    let path = url.path().trim_start_matches('/');
    let first_label = host.split('.').next()?;

    if first_label == "s3" || first_label.starts_with("s3-") {
        let (bucket, key) = path.split_once('/')?;
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        Some((bucket.to_string(), key.to_string()))
    } else if host.contains(".s3.") || host.contains(".s3-") {
        if path.is_empty() {
            return None;
        }
        Some((first_label.to_string(), path.to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_virtual_hosted_style() {
        let parsed = parse_s3_url("https://my-bucket.s3.eu-west-1.amazonaws.com/users/1/img.jpg");
        assert_eq!(
            parsed,
            Some(("my-bucket".to_string(), "users/1/img.jpg".to_string()))
        );
    }

    #[test]
    fn parses_path_style() {
        let parsed = parse_s3_url("https://s3.eu-west-1.amazonaws.com/my-bucket/users/1/img.jpg");
        assert_eq!(
            parsed,
            Some(("my-bucket".to_string(), "users/1/img.jpg".to_string()))
        );
    }

    #[test]
    fn rejects_non_s3_urls() {
        assert_eq!(parse_s3_url("https://example.com/image.jpg"), None);
        assert_eq!(parse_s3_url("not a url"), None);
        assert_eq!(parse_s3_url("https://s3.eu-west-1.amazonaws.com/"), None);
    }
}
