use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "credit_transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionType {
    Purchase,
    GenerationUse,
    Refund,
    Bonus,
}

impl std::fmt::Display for CreditTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreditTransactionType::Purchase => write!(f, "purchase"),
            CreditTransactionType::GenerationUse => write!(f, "generation_use"),
            CreditTransactionType::Refund => write!(f, "refund"),
            CreditTransactionType::Bonus => write!(f, "bonus"),
        }
    }
}

/// One append-only ledger row. `amount` is signed: negative for debits,
/// positive for credits. The per-user sum must always equal `users.credits`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub transaction_type: CreditTransactionType,
    pub description: String,
    pub purchase_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreditTransactionResponse {
    pub id: Uuid,
    pub amount: i64,
    pub transaction_type: CreditTransactionType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransaction> for CreditTransactionResponse {
    fn from(tx: CreditTransaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount,
            transaction_type: tx.transaction_type,
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}
