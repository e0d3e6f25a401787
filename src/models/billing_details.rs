use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Invoicing profile, one per user. `billing_type` is either "personal" or
/// "company"; CUI and Reg. Com. only matter for the company variant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BillingDetails {
    pub user_id: Uuid,
    pub billing_type: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: Option<String>,
    pub cui: Option<String>,
    pub reg_com: Option<String>,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub zip: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BillingDetailsRequest {
    #[serde(default = "default_billing_type")]
    pub billing_type: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: Option<String>,
    pub cui: Option<String>,
    pub reg_com: Option<String>,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
    pub zip: Option<String>,
}

fn default_billing_type() -> String {
    "personal".to_string()
}

fn default_country() -> String {
    "Romania".to_string()
}
