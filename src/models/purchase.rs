use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "purchase_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Amount paid, in bani (RON cents).
    pub amount: i64,
    /// Credits granted on completion, bonus included.
    pub credits: i64,
    pub currency: String,
    pub status: PurchaseStatus,
    pub stripe_session_id: Option<String>,
    pub invoice_series: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCheckoutRequest {
    #[schema(example = "creator")]
    pub package_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub purchase_id: Uuid,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseResponse {
    pub id: Uuid,
    pub amount: i64,
    pub credits: i64,
    pub currency: String,
    pub status: PurchaseStatus,
    pub invoice_series: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Purchase> for PurchaseResponse {
    fn from(p: Purchase) -> Self {
        Self {
            id: p.id,
            amount: p.amount,
            credits: p.credits,
            currency: p.currency,
            status: p.status,
            invoice_series: p.invoice_series,
            invoice_number: p.invoice_number,
            invoice_url: p.invoice_url,
            created_at: p.created_at,
            completed_at: p.completed_at,
        }
    }
}
