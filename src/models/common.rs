use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body shape of every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}
