use crate::config::SketchfabConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    glb: Option<FormatInfo>,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    url: Option<String>,
}

#[derive(Clone)]
pub struct SketchfabService {
    client: Client,
    config: SketchfabConfig,
}

impl SketchfabService {
    pub fn new(config: SketchfabConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Resolve the short-lived GLB download URL for a model uid.
    pub async fn get_glb_url(&self, uid: &str) -> AppResult<String> {
        let url = format!("{}/v3/models/{}/download", self.config.base_url, uid);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.config.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Failed to get download link from Sketchfab: HTTP {}",
                response.status()
            )));
        }

        let download: DownloadResponse = response.json().await?;

        download
            .glb
            .and_then(|glb| glb.url)
            .ok_or_else(|| {
                AppError::NotFound("No GLB download available for this model".to_string())
            })
    }

    pub async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Failed to download file content: HTTP {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
