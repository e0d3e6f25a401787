use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use uuid::Uuid;

/// S3-compatible object storage (Cloudflare R2 in production). Owns every
/// model file after fulfillment; keys are deterministic per generation.
#[derive(Clone)]
pub struct StorageService {
    client: aws_sdk_s3::Client,
    http: reqwest::Client,
    bucket: String,
    public_base_url: String,
}

impl StorageService {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let s3_config = aws_sdk_s3::config::Builder::new()
            .region(Region::new("auto"))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            http: reqwest::Client::new(),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    pub async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> AppResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Storage upload failed: {e}")))?;

        Ok(())
    }

    /// Returns the object bytes and content type, or NotFound for a missing
    /// key.
    pub async fn get_object(&self, key: &str) -> AppResult<(Vec<u8>, Option<String>)> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    AppError::NotFound("File not found".to_string())
                } else {
                    AppError::ExternalApiError(format!("Storage read failed: {service_err}"))
                }
            })?;

        let content_type = output.content_type().map(|s| s.to_string());
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Storage read failed: {e}")))?
            .into_bytes()
            .to_vec();

        Ok((bytes, content_type))
    }

    pub async fn delete_object(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Storage delete failed: {e}")))?;

        Ok(())
    }

    /// Relay a remote file (e.g. a provider-hosted GLB the viewer loads
    /// before migration) through our own origin.
    pub async fn fetch_remote(&self, url: &str) -> AppResult<(Vec<u8>, Option<String>)> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Failed to fetch remote file: HTTP {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Ok((response.bytes().await?.to_vec(), content_type))
    }

    pub fn public_url(&self, key: &str) -> String {
        build_public_url(&self.public_base_url, key)
    }

    /// Inverse of [`public_url`](Self::public_url): the storage key behind a
    /// public URL, or None for URLs outside our base (provider-hosted files).
    pub fn key_for_public_url(&self, url: &str) -> Option<String> {
        key_from_public_url(&self.public_base_url, url)
    }
}

/// Deterministic storage key for a generation's model file.
pub fn generation_key(generation_id: &Uuid) -> String {
    format!("generations/{generation_id}.glb")
}

/// Storage key for a marketplace asset copy.
pub fn marketplace_key(asset_id: &Uuid) -> String {
    format!("generations/sketchfab_{asset_id}.glb")
}

fn build_public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

fn key_from_public_url(base: &str, url: &str) -> Option<String> {
    let rest = url.strip_prefix(base.trim_end_matches('/'))?;
    let key = rest.trim_start_matches('/');
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_joining() {
        assert_eq!(
            build_public_url("https://kidmy.ro/api/v1/storage/", "generations/a.glb"),
            "https://kidmy.ro/api/v1/storage/generations/a.glb"
        );
        assert_eq!(
            build_public_url("https://pub-123.r2.dev", "models/b.glb"),
            "https://pub-123.r2.dev/models/b.glb"
        );
    }

    #[test]
    fn key_recovery_inverts_public_url_for_every_key_shape() {
        let base = "https://kidmy.ro/api/v1/storage";
        let id = Uuid::new_v4();

        // Generated and marketplace objects live under different keys; the
        // recovered key must match what was written for both.
        for key in [generation_key(&id), marketplace_key(&id)] {
            let url = build_public_url(base, &key);
            assert_eq!(key_from_public_url(base, &url).as_deref(), Some(key.as_str()));
        }

        assert_eq!(
            key_from_public_url(base, "https://replicate.delivery/pbxt/abc/out.glb"),
            None
        );
        assert_eq!(key_from_public_url(base, base), None);
    }

    #[test]
    fn keys_are_deterministic() {
        let id = Uuid::nil();
        assert_eq!(
            generation_key(&id),
            "generations/00000000-0000-0000-0000-000000000000.glb"
        );
        assert!(marketplace_key(&id).starts_with("generations/sketchfab_"));
    }
}
