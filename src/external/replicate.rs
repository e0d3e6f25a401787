use crate::config::ReplicateConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// How long a submitted prediction is polled before giving up: 60 x 1s.
pub const POLL_MAX_ATTEMPTS: u32 = 60;
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

/// A prediction as returned by the provider. `output` is model-dependent and
/// deliberately left as raw JSON; [`extract_output_url`] is the only place
/// that interprets its shape.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Prediction {
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(s)) => s.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => "Generation failed".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ReplicateService {
    client: Client,
    config: ReplicateConfig,
}

impl ReplicateService {
    pub fn new(config: ReplicateConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn submit(&self, url: &str, body: Value) -> AppResult<Prediction> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Token {}", self.config.api_token))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Replicate prediction submit failed: {error_text}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Submit a prediction against a named model (latest version).
    pub async fn create_model_prediction(&self, model: &str, input: Value) -> AppResult<Prediction> {
        let url = format!("{}/v1/models/{}/predictions", self.config.base_url, model);
        self.submit(&url, serde_json::json!({ "input": input })).await
    }

    /// Submit a prediction against a pinned version hash.
    pub async fn create_version_prediction(
        &self,
        version: &str,
        input: Value,
    ) -> AppResult<Prediction> {
        let url = format!("{}/v1/predictions", self.config.base_url);
        self.submit(&url, serde_json::json!({ "version": version, "input": input }))
            .await
    }

    pub async fn get_prediction(&self, id: &str) -> AppResult<Prediction> {
        let url = format!("{}/v1/predictions/{}", self.config.base_url, id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.config.api_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Replicate prediction lookup failed: {error_text}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Poll a submitted prediction until it reaches a terminal state and
    /// return its output. Bounded; a prediction still running after the
    /// attempt budget is reported as an upstream error.
    pub async fn wait_for_output(&self, id: &str, max_attempts: u32) -> AppResult<Value> {
        for _ in 0..max_attempts {
            let prediction = self.get_prediction(id).await?;

            match prediction.status {
                PredictionStatus::Succeeded => {
                    return prediction.output.ok_or_else(|| {
                        AppError::ExternalApiError(
                            "Prediction succeeded without output".to_string(),
                        )
                    });
                }
                PredictionStatus::Failed | PredictionStatus::Canceled => {
                    return Err(AppError::ExternalApiError(prediction.error_message()));
                }
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }

        Err(AppError::ExternalApiError(format!(
            "Prediction {id} timed out after {max_attempts} attempts"
        )))
    }

    /// Best-effort prompt translation to English. Falls back to the original
    /// text on any provider error, so a flaky LLM never blocks a generation.
    pub async fn translate_text(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let input = serde_json::json!({
            "prompt": format!(
                "Translate the following to English (if it is not already). \
                 Return ONLY the translated text, nothing else. Text: \"{text}\""
            ),
            "max_tokens": 128,
            "temperature": 0.1
        });

        let result: AppResult<String> = async {
            let prediction = self
                .create_model_prediction(&self.config.llm_model, input)
                .await?;
            let output = self.wait_for_output(&prediction.id, POLL_MAX_ATTEMPTS).await?;
            Ok(join_text_output(&output))
        }
        .await;

        match result {
            Ok(translated) if !translated.is_empty() => {
                log::info!("Translated prompt: \"{text}\" -> \"{translated}\"");
                translated
            }
            Ok(_) => text.to_string(),
            Err(e) => {
                log::warn!("Prompt translation failed, keeping original: {e}");
                text.to_string()
            }
        }
    }

    /// Fetch raw bytes from a provider-hosted output URL.
    pub async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Failed to download prediction output: HTTP {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    pub fn config(&self) -> &ReplicateConfig {
        &self.config
    }
}

/// Known output fields that carry the model file URL, tried in order.
const KNOWN_URL_FIELDS: &[&str] = &["model_file", "glb", "mesh", "file", "audio"];

/// Normalize the provider's loosely-typed output into a URL, once, at the
/// adapter boundary. Shapes seen in the wild: a bare string, an array of
/// strings, an object with a known field, or an object whose first string
/// value is the URL. Anything else is unrecognized.
pub fn extract_output_url(output: &Value) -> Option<String> {
    match output {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }),
        Value::Object(map) => {
            for field in KNOWN_URL_FIELDS {
                if let Some(Value::String(s)) = map.get(*field) {
                    if !s.is_empty() {
                        return Some(s.clone());
                    }
                }
            }
            map.values().find_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
        }
        _ => None,
    }
}

/// LLM outputs arrive as a token array; join and trim them into one string.
pub fn join_text_output(output: &Value) -> String {
    match output {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<String>()
            .trim()
            .to_string(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_from_bare_string() {
        let output = json!("https://replicate.delivery/pbxt/abc/out.png");
        assert_eq!(
            extract_output_url(&output).as_deref(),
            Some("https://replicate.delivery/pbxt/abc/out.png")
        );
    }

    #[test]
    fn extract_from_array_head() {
        let output = json!([null, "https://replicate.delivery/pbxt/abc/out.png"]);
        assert_eq!(
            extract_output_url(&output).as_deref(),
            Some("https://replicate.delivery/pbxt/abc/out.png")
        );
    }

    #[test]
    fn extract_prefers_known_fields() {
        let output = json!({
            "color_video": "https://example.com/video.mp4",
            "model_file": "https://example.com/model.glb"
        });
        assert_eq!(
            extract_output_url(&output).as_deref(),
            Some("https://example.com/model.glb")
        );
    }

    #[test]
    fn extract_falls_back_to_first_string_value() {
        let output = json!({
            "seed": 42,
            "result": "https://example.com/whatever.glb"
        });
        assert_eq!(
            extract_output_url(&output).as_deref(),
            Some("https://example.com/whatever.glb")
        );
    }

    #[test]
    fn extract_unrecognized_shapes() {
        assert!(extract_output_url(&json!(null)).is_none());
        assert!(extract_output_url(&json!({})).is_none());
        assert!(extract_output_url(&json!({"seed": 42})).is_none());
        assert!(extract_output_url(&json!("")).is_none());
    }

    #[test]
    fn join_token_array() {
        let output = json!(["Un ", "dinozaur ", "prietenos"]);
        assert_eq!(join_text_output(&output), "Un dinozaur prietenos");
    }

    #[test]
    fn prediction_error_message_shapes() {
        let failed: Prediction = serde_json::from_value(json!({
            "id": "p1",
            "status": "failed",
            "error": "NSFW content detected"
        }))
        .unwrap();
        assert_eq!(failed.error_message(), "NSFW content detected");

        let canceled: Prediction = serde_json::from_value(json!({
            "id": "p2",
            "status": "canceled"
        }))
        .unwrap();
        assert_eq!(canceled.error_message(), "Generation failed");
    }
}
