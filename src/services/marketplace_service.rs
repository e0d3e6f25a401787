use crate::error::{AppError, AppResult};
use crate::external::sketchfab::SketchfabService;
use crate::external::storage::{marketplace_key, StorageService};
use crate::models::{CreditTransactionType, GenerationResponse, GenerationStatus};
use crate::services::CreditService;
use sqlx::PgPool;
use uuid::Uuid;

const MODEL_CONTENT_TYPE: &str = "model/gltf-binary";

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct BuyModelRequest {
    /// Sketchfab model uid.
    pub uid: String,
    pub name: String,
    /// Price in credits.
    pub price: i64,
}

#[derive(Clone)]
pub struct MarketplaceService {
    pool: PgPool,
    sketchfab: SketchfabService,
    storage: StorageService,
    credits: CreditService,
}

impl MarketplaceService {
    pub fn new(
        pool: PgPool,
        sketchfab: SketchfabService,
        storage: StorageService,
        credits: CreditService,
    ) -> Self {
        Self {
            pool,
            sketchfab,
            storage,
            credits,
        }
    }

    /// Buy a marketplace model: resolve the download link first, then debit,
    /// then copy the file into owned storage and record it as a completed
    /// generation. Failures after the debit refund the price.
    pub async fn buy(&self, user_id: Uuid, request: BuyModelRequest) -> AppResult<GenerationResponse> {
        if request.uid.trim().is_empty() {
            return Err(AppError::ValidationError("Model uid is required".to_string()));
        }
        if request.price <= 0 {
            return Err(AppError::ValidationError("Price must be positive".to_string()));
        }

        // Resolve before charging so a missing download costs nothing.
        let download_url = self.sketchfab.get_glb_url(&request.uid).await?;

        self.credits
            .debit(
                user_id,
                request.price,
                CreditTransactionType::GenerationUse,
                &format!("Cumpărare model - {}", request.name),
            )
            .await?;

        match self.fetch_and_record(user_id, &request, &download_url).await {
            Ok(generation) => Ok(generation),
            Err(e) => {
                if let Err(refund_err) = self
                    .credits
                    .credit(
                        user_id,
                        request.price,
                        CreditTransactionType::Refund,
                        &format!("Returnare credite - {}", request.name),
                    )
                    .await
                {
                    log::error!(
                        "Failed to refund user {user_id} after marketplace failure: {refund_err}"
                    );
                }
                Err(e)
            }
        }
    }

    async fn fetch_and_record(
        &self,
        user_id: Uuid,
        request: &BuyModelRequest,
        download_url: &str,
    ) -> AppResult<GenerationResponse> {
        let bytes = self.sketchfab.download(download_url).await?;

        let generation_id = Uuid::new_v4();
        let key = marketplace_key(&generation_id);
        self.storage
            .put_object(&key, bytes, MODEL_CONTENT_TYPE)
            .await?;
        let model_url = self.storage.public_url(&key);

        let generation = sqlx::query_as::<_, crate::models::Generation>(
            r#"
            INSERT INTO generations
                (id, user_id, prompt, status, model_url, credits_cost, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            RETURNING id, user_id, prompt, original_image_url, prediction_id, status, model_url,
                      credits_cost, error_message, is_public, created_at, completed_at
            "#,
        )
        .bind(generation_id)
        .bind(user_id)
        .bind(&request.name)
        .bind(GenerationStatus::Completed)
        .bind(&model_url)
        .bind(request.price)
        .fetch_one(&self.pool)
        .await?;

        log::info!(
            "User {user_id} bought marketplace model {} as generation {generation_id}",
            request.uid
        );

        Ok(GenerationResponse::from(generation))
    }
}
