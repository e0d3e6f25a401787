use crate::error::{AppError, AppResult};
use crate::external::replicate::{
    extract_output_url, join_text_output, ReplicateService, POLL_MAX_ATTEMPTS,
};
use crate::models::{StoryRequest, StoryResponse};

#[derive(Clone)]
pub struct StoryService {
    replicate: ReplicateService,
}

impl StoryService {
    pub fn new(replicate: ReplicateService) -> Self {
        Self { replicate }
    }

    /// Generate a short Romanian story about the child's creation and narrate
    /// it. The audio stage is best effort; a story without narration is still
    /// a story.
    pub async fn tell_story(&self, request: StoryRequest) -> AppResult<StoryResponse> {
        let name = request.animal_name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Spune-ne cum se numește animăluțul tău!".to_string(),
            ));
        }

        let story = self.generate_story(name, &request.description).await?;

        let audio_url = match self.narrate(&story).await {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Narration failed, returning text-only story: {e}");
                None
            }
        };

        Ok(StoryResponse { story, audio_url })
    }

    async fn generate_story(&self, name: &str, description: &str) -> AppResult<String> {
        let config = self.replicate.config().clone();

        let mut prompt = format!(
            "Scrie o poveste scurtă și veselă în limba română pentru un copil de 5-8 ani \
             despre un animăluț pe nume {name}. Include 2-3 curiozități reale despre acest \
             tip de animal, povestite simplu. Maxim 150 de cuvinte."
        );
        let description = description.trim();
        if !description.is_empty() {
            prompt.push_str(&format!(" Animăluțul arată așa: {description}."));
        }

        let prediction = self
            .replicate
            .create_model_prediction(
                &config.llm_model,
                serde_json::json!({
                    "prompt": prompt,
                    "max_tokens": 512,
                    "temperature": 0.8
                }),
            )
            .await?;

        let output = self
            .replicate
            .wait_for_output(&prediction.id, POLL_MAX_ATTEMPTS)
            .await?;

        let story = join_text_output(&output);
        if story.trim().is_empty() {
            return Err(AppError::ExternalApiError(
                "Story generation returned empty output".to_string(),
            ));
        }

        Ok(story.trim().to_string())
    }

    async fn narrate(&self, story: &str) -> AppResult<Option<String>> {
        let config = self.replicate.config().clone();

        let prediction = self
            .replicate
            .create_version_prediction(
                &config.voice_version,
                serde_json::json!({
                    "text": story,
                    "language": "ro",
                    "cleanup_voice": true
                }),
            )
            .await?;

        let output = self
            .replicate
            .wait_for_output(&prediction.id, POLL_MAX_ATTEMPTS)
            .await?;

        Ok(extract_output_url(&output))
    }
}
