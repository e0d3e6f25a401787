use crate::error::{AppError, AppResult};
use crate::external::replicate::{
    extract_output_url, Prediction, PredictionStatus, ReplicateService, POLL_MAX_ATTEMPTS,
};
use crate::external::storage::{generation_key, StorageService};
use crate::models::{
    CreateGenerationRequest, CreditTransactionType, Generation, GenerationLaunchResponse,
    GenerationMode, GenerationResponse, GenerationStatus, GenerationStatusResponse,
    GENERATION_COST,
};
use crate::services::CreditService;
use crate::utils::{PaginatedResponse, PaginationParams};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const MODEL_CONTENT_TYPE: &str = "model/gltf-binary";

/// Jobs stuck in `processing` longer than this are swept to `failed`.
pub const STALE_AFTER_MINUTES: i64 = 30;

#[derive(Clone)]
pub struct GenerationService {
    pool: PgPool,
    replicate: ReplicateService,
    storage: StorageService,
    credits: CreditService,
}

impl GenerationService {
    pub fn new(
        pool: PgPool,
        replicate: ReplicateService,
        storage: StorageService,
        credits: CreditService,
    ) -> Self {
        Self {
            pool,
            replicate,
            storage,
            credits,
        }
    }

    /// Launch a generation: debit first, then submit the provider job(s) and
    /// persist the tracking record. Any failure after the debit refunds the
    /// full cost before the error propagates, so no charge survives a job
    /// that never started.
    pub async fn launch(
        &self,
        user_id: Uuid,
        request: CreateGenerationRequest,
    ) -> AppResult<GenerationLaunchResponse> {
        let has_prompt = request
            .prompt
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false);
        let has_image = request
            .image_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false);

        if !has_prompt && !has_image {
            return Err(AppError::ValidationError(
                "Ai nevoie de un text sau o imagine!".to_string(),
            ));
        }

        self.credits
            .debit(
                user_id,
                GENERATION_COST,
                CreditTransactionType::GenerationUse,
                "Generare jucărie 3D",
            )
            .await?;

        match self.submit_and_record(user_id, &request, has_prompt).await {
            Ok(response) => Ok(response),
            Err(e) => {
                // Compensation: the job never started, give the credits back.
                if let Err(refund_err) = self
                    .credits
                    .credit(
                        user_id,
                        GENERATION_COST,
                        CreditTransactionType::Refund,
                        "Returnare credite - generarea nu a pornit",
                    )
                    .await
                {
                    log::error!(
                        "Failed to refund user {user_id} after launch failure: {refund_err}"
                    );
                }
                Err(e)
            }
        }
    }

    async fn submit_and_record(
        &self,
        user_id: Uuid,
        request: &CreateGenerationRequest,
        has_prompt: bool,
    ) -> AppResult<GenerationLaunchResponse> {
        let mut source_image = request.image_url.clone();

        if request.mode == GenerationMode::Text && has_prompt {
            let prompt = request.prompt.as_deref().unwrap_or_default();
            log::info!("Generating base image from text: {prompt}");
            source_image = Some(self.generate_base_image(prompt).await?);
        }

        let image_url = source_image.clone().ok_or_else(|| {
            AppError::ValidationError("Ai nevoie de un text sau o imagine!".to_string())
        })?;

        log::info!("Submitting image->3D job for user {user_id}");
        let config = self.replicate.config().clone();
        let prediction = self
            .replicate
            .create_version_prediction(
                &config.image_to_3d_version,
                serde_json::json!({
                    "images": [image_url],
                    "generate_model": true,
                    "generate_color": true,
                    "save_gaussian_ply": true,
                    "randomize_seed": true
                }),
            )
            .await?;

        let generation_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO generations
                (id, user_id, prompt, original_image_url, prediction_id, status, credits_cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(generation_id)
        .bind(user_id)
        .bind(&request.prompt)
        .bind(&source_image)
        .bind(&prediction.id)
        .bind(GenerationStatus::Processing)
        .bind(GENERATION_COST)
        .execute(&self.pool)
        .await?;

        Ok(GenerationLaunchResponse {
            generation_id,
            prediction_id: prediction.id,
            status: GenerationStatus::Processing,
            credits_cost: GENERATION_COST,
        })
    }

    /// Text -> image stage: translate the (usually Romanian) prompt, submit
    /// the flux job and wait for the image URL within the poll budget.
    async fn generate_base_image(&self, prompt: &str) -> AppResult<String> {
        let config = self.replicate.config().clone();
        let translated = self.replicate.translate_text(prompt).await;

        let prediction = self
            .replicate
            .create_model_prediction(
                &config.text_to_image_model,
                serde_json::json!({
                    "prompt": format!(
                        "A cute 3d render of {translated}, white background, high quality, \
                         cartoony style, pixar style, 4k"
                    ),
                    "width": 1024,
                    "height": 1024,
                    "aspect_ratio": "1:1",
                    "output_format": "png",
                    "safety_tolerance": 2
                }),
            )
            .await?;

        let output = self
            .replicate
            .wait_for_output(&prediction.id, POLL_MAX_ATTEMPTS)
            .await?;

        extract_output_url(&output).ok_or_else(|| {
            AppError::ExternalApiError("Image generation returned no usable URL".to_string())
        })
    }

    /// Poll the provider for a generation and, on terminal success, migrate
    /// the output into owned storage. Idempotent per terminal outcome: a
    /// completed generation always answers with the stored URL and never
    /// touches storage again.
    pub async fn check_status(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
    ) -> AppResult<GenerationStatusResponse> {
        let generation = self.get_owned(user_id, generation_id).await?;

        match generation.status {
            GenerationStatus::Completed => {
                return Ok(GenerationStatusResponse {
                    generation_id,
                    status: GenerationStatus::Completed,
                    model_url: generation.model_url,
                    error: None,
                });
            }
            GenerationStatus::Failed => {
                return Ok(GenerationStatusResponse {
                    generation_id,
                    status: GenerationStatus::Failed,
                    model_url: None,
                    error: generation.error_message,
                });
            }
            GenerationStatus::Processing => {}
        }

        let prediction_id = generation.prediction_id.clone().ok_or_else(|| {
            AppError::InternalError(format!("Generation {generation_id} has no prediction id"))
        })?;

        let prediction = self.replicate.get_prediction(&prediction_id).await?;

        match classify_prediction(&prediction) {
            PollOutcome::Fulfilled(url) => self.fulfill(&generation, &url).await,
            PollOutcome::Failed(message) => {
                self.fail_generation(generation_id, &message).await?;
                Ok(GenerationStatusResponse {
                    generation_id,
                    status: GenerationStatus::Failed,
                    model_url: None,
                    error: Some(message),
                })
            }
            PollOutcome::Pending => Ok(GenerationStatusResponse {
                generation_id,
                status: GenerationStatus::Processing,
                model_url: None,
                error: None,
            }),
        }
    }

    /// Success branch: download from the provider, upload under our
    /// deterministic key, then compare-and-set `processing -> completed`.
    /// A lost CAS means another poll finished first; answer with whatever it
    /// stored.
    async fn fulfill(
        &self,
        generation: &Generation,
        provider_url: &str,
    ) -> AppResult<GenerationStatusResponse> {
        log::info!(
            "Migrating output of generation {} into owned storage",
            generation.id
        );

        let bytes = self.replicate.download(provider_url).await?;
        let key = generation_key(&generation.id);
        self.storage
            .put_object(&key, bytes, MODEL_CONTENT_TYPE)
            .await?;
        let model_url = self.storage.public_url(&key);

        let updated = sqlx::query(
            r#"
            UPDATE generations
            SET status = $1, model_url = $2, completed_at = now(), error_message = NULL
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(GenerationStatus::Completed)
        .bind(&model_url)
        .bind(generation.id)
        .bind(GenerationStatus::Processing)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            // Concurrent fulfillment won the CAS; report its result.
            let current = self.get_by_id(generation.id).await?;
            return Ok(GenerationStatusResponse {
                generation_id: generation.id,
                status: current.status,
                model_url: current.model_url,
                error: current.error_message,
            });
        }

        Ok(GenerationStatusResponse {
            generation_id: generation.id,
            status: GenerationStatus::Completed,
            model_url: Some(model_url),
            error: None,
        })
    }

    /// Terminal failure: compare-and-set `processing -> failed` and refund
    /// the debit in the same transaction. Only the CAS winner refunds, so a
    /// failure is compensated exactly once.
    pub async fn fail_generation(&self, generation_id: Uuid, message: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Uuid, i64)> = sqlx::query_as(
            r#"
            UPDATE generations
            SET status = $1, error_message = $2, completed_at = now()
            WHERE id = $3 AND status = $4
            RETURNING user_id, credits_cost
            "#,
        )
        .bind(GenerationStatus::Failed)
        .bind(message)
        .bind(generation_id)
        .bind(GenerationStatus::Processing)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, credits_cost)) = row else {
            // Already terminal; nothing to do.
            return Ok(false);
        };

        if credits_cost > 0 {
            CreditService::credit_in_tx(
                &mut tx,
                user_id,
                credits_cost,
                CreditTransactionType::Refund,
                "Returnare credite - generarea a eșuat",
                None,
            )
            .await?;
        }

        tx.commit().await?;

        log::warn!("Generation {generation_id} failed: {message}");

        Ok(true)
    }

    /// Reconciliation sweep: fail every job stuck in `processing` beyond the
    /// cutoff so orphaned generations stop depending on the client polling.
    pub async fn expire_stale_generations(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::minutes(STALE_AFTER_MINUTES);

        let stale_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM generations WHERE status = $1 AND created_at < $2",
        )
        .bind(GenerationStatus::Processing)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut expired = 0u64;
        for id in stale_ids {
            if self
                .fail_generation(id, "Generarea a expirat - încearcă din nou")
                .await?
            {
                expired += 1;
            }
        }

        Ok(expired)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<GenerationResponse>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM generations WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let generations = sqlx::query_as::<_, Generation>(
            r#"
            SELECT id, user_id, prompt, original_image_url, prediction_id, status, model_url,
                   credits_cost, error_message, is_public, created_at, completed_at
            FROM generations
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(params.get_per_page() as i64)
        .bind(params.get_offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = generations.into_iter().map(GenerationResponse::from).collect();

        Ok(PaginatedResponse::new(items, params, total))
    }

    /// Public gallery: latest completed generations marked public.
    pub async fn list_public_gallery(&self, limit: i64) -> AppResult<Vec<GenerationResponse>> {
        let generations = sqlx::query_as::<_, Generation>(
            r#"
            SELECT id, user_id, prompt, original_image_url, prediction_id, status, model_url,
                   credits_cost, error_message, is_public, created_at, completed_at
            FROM generations
            WHERE status = $1 AND is_public = TRUE
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(GenerationStatus::Completed)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(generations.into_iter().map(GenerationResponse::from).collect())
    }

    /// Share or unshare a toy in the public gallery. Only completed
    /// generations can go public.
    pub async fn set_visibility(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
        is_public: bool,
    ) -> AppResult<()> {
        let generation = self.get_owned(user_id, generation_id).await?;

        if is_public && generation.status != GenerationStatus::Completed {
            return Err(AppError::ValidationError(
                "Doar jucăriile finalizate pot fi publicate!".to_string(),
            ));
        }

        sqlx::query("UPDATE generations SET is_public = $1 WHERE id = $2")
            .bind(is_public)
            .bind(generation_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Owner delete: remove the stored object best-effort, then the record.
    /// A storage failure is logged and the row still goes away. The key comes
    /// from the stored URL, not the generation id: marketplace copies live
    /// under a different key than generated models.
    pub async fn delete(&self, user_id: Uuid, generation_id: Uuid) -> AppResult<()> {
        let generation = self.get_owned(user_id, generation_id).await?;

        if let Some(url) = generation.model_url.as_deref() {
            match self.storage.key_for_public_url(url) {
                Some(key) => {
                    if let Err(e) = self.storage.delete_object(&key).await {
                        log::error!("Failed to delete stored model {key}: {e}");
                    }
                }
                None => log::warn!(
                    "Generation {generation_id} model URL is outside owned storage, nothing to delete: {url}"
                ),
            }
        }

        sqlx::query("DELETE FROM generations WHERE id = $1")
            .bind(generation_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_by_id(&self, generation_id: Uuid) -> AppResult<Generation> {
        sqlx::query_as::<_, Generation>(
            r#"
            SELECT id, user_id, prompt, original_image_url, prediction_id, status, model_url,
                   credits_cost, error_message, is_public, created_at, completed_at
            FROM generations
            WHERE id = $1
            "#,
        )
        .bind(generation_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Generation not found".to_string()))
    }

    async fn get_owned(&self, user_id: Uuid, generation_id: Uuid) -> AppResult<Generation> {
        let generation = self.get_by_id(generation_id).await?;

        if generation.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        Ok(generation)
    }
}

/// What a polled prediction means for the generation row.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    Fulfilled(String),
    Failed(String),
    Pending,
}

/// Route a prediction to its terminal action. A succeeded prediction whose
/// output carries no usable URL is a failure, never a completed row without a
/// model; failures go on to refund through `fail_generation`.
pub(crate) fn classify_prediction(prediction: &Prediction) -> PollOutcome {
    match prediction.status {
        PredictionStatus::Succeeded => {
            let output = prediction.output.clone().unwrap_or(serde_json::Value::Null);
            match extract_output_url(&output) {
                Some(url) => PollOutcome::Fulfilled(url),
                None => {
                    PollOutcome::Failed("Formatul rezultatului nu este recunoscut".to_string())
                }
            }
        }
        PredictionStatus::Failed | PredictionStatus::Canceled => {
            PollOutcome::Failed(prediction.error_message())
        }
        PredictionStatus::Starting | PredictionStatus::Processing => PollOutcome::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prediction(value: serde_json::Value) -> Prediction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn succeeded_prediction_routes_to_fulfillment() {
        let p = prediction(json!({
            "id": "p1",
            "status": "succeeded",
            "output": { "model_file": "https://example.com/model.glb" }
        }));
        assert_eq!(
            classify_prediction(&p),
            PollOutcome::Fulfilled("https://example.com/model.glb".to_string())
        );
    }

    #[test]
    fn unrecognized_output_fails_the_generation() {
        let p = prediction(json!({
            "id": "p2",
            "status": "succeeded",
            "output": { "seed": 42 }
        }));
        assert_eq!(
            classify_prediction(&p),
            PollOutcome::Failed("Formatul rezultatului nu este recunoscut".to_string())
        );
    }

    #[test]
    fn provider_failure_carries_its_message() {
        let p = prediction(json!({
            "id": "p3",
            "status": "failed",
            "error": "NSFW content detected"
        }));
        assert_eq!(
            classify_prediction(&p),
            PollOutcome::Failed("NSFW content detected".to_string())
        );
    }

    #[test]
    fn running_prediction_stays_pending() {
        for status in ["starting", "processing"] {
            let p = prediction(json!({ "id": "p4", "status": status }));
            assert_eq!(classify_prediction(&p), PollOutcome::Pending);
        }
    }
}
