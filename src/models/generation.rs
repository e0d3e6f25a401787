use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "generation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Generation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: Option<String>,
    pub original_image_url: Option<String>,
    pub prediction_id: Option<String>,
    pub status: GenerationStatus,
    pub model_url: Option<String>,
    pub credits_cost: i64,
    pub error_message: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Text,
    Image,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateGenerationRequest {
    #[schema(example = "un dinozaur prietenos")]
    pub prompt: Option<String>,
    pub image_url: Option<String>,
    pub mode: GenerationMode,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateVisibilityRequest {
    pub is_public: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationLaunchResponse {
    pub generation_id: Uuid,
    pub prediction_id: String,
    pub status: GenerationStatus,
    pub credits_cost: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationStatusResponse {
    pub generation_id: Uuid,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationResponse {
    pub id: Uuid,
    pub prompt: Option<String>,
    pub original_image_url: Option<String>,
    pub status: GenerationStatus,
    pub model_url: Option<String>,
    pub credits_cost: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Generation> for GenerationResponse {
    fn from(g: Generation) -> Self {
        Self {
            id: g.id,
            prompt: g.prompt,
            original_image_url: g.original_image_url,
            status: g.status,
            model_url: g.model_url,
            credits_cost: g.credits_cost,
            error_message: g.error_message,
            created_at: g.created_at,
            completed_at: g.completed_at,
        }
    }
}
