use crate::error::{AppError, AppResult};
use crate::models::{
    CreditTransaction, CreditTransactionResponse, CreditTransactionType,
};
use crate::utils::{PaginatedResponse, PaginationParams};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// The credit ledger. Every balance change goes through here: a conditional
/// balance update plus one append-only transaction row, committed together.
#[derive(Clone)]
pub struct CreditService {
    pool: PgPool,
}

impl CreditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Debit `amount` credits. The balance check and the decrement are one
    /// conditional UPDATE, so two concurrent debits can never overdraw.
    /// Returns the new balance.
    pub async fn debit(
        &self,
        user_id: Uuid,
        amount: i64,
        transaction_type: CreditTransactionType,
        description: &str,
    ) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;
        let balance =
            Self::debit_in_tx(&mut tx, user_id, amount, transaction_type, description).await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// Credit `amount` credits. Returns the new balance.
    pub async fn credit(
        &self,
        user_id: Uuid,
        amount: i64,
        transaction_type: CreditTransactionType,
        description: &str,
    ) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;
        let balance =
            Self::credit_in_tx(&mut tx, user_id, amount, transaction_type, description, None)
                .await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// Debit building block for callers composing the ledger write with their
    /// own state changes in one transaction.
    pub async fn debit_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: i64,
        transaction_type: CreditTransactionType,
        description: &str,
    ) -> AppResult<i64> {
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Debit amount must be positive".to_string(),
            ));
        }

        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET credits = credits - $1,
                total_credits_used = total_credits_used + $1,
                updated_at = now()
            WHERE id = $2 AND credits >= $1
            RETURNING credits
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        let balance = debit_balance(balance)?;

        Self::insert_transaction(tx, user_id, -amount, transaction_type, description, None).await?;

        log::info!("Debited {amount} credits from user {user_id}, balance now {balance}");

        Ok(balance)
    }

    /// Credit building block. A `refund` reverses the matching debit's
    /// `total_credits_used` increment so a debit/refund pair nets to zero on
    /// both counters.
    pub async fn credit_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: i64,
        transaction_type: CreditTransactionType,
        description: &str,
        purchase_id: Option<Uuid>,
    ) -> AppResult<i64> {
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Credit amount must be positive".to_string(),
            ));
        }

        let reversal = usage_reversal(transaction_type, amount);

        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET credits = credits + $1,
                total_credits_used = total_credits_used - $2,
                updated_at = now()
            WHERE id = $3
            RETURNING credits
            "#,
        )
        .bind(amount)
        .bind(reversal)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        let balance =
            balance.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Self::insert_transaction(tx, user_id, amount, transaction_type, description, purchase_id)
            .await?;

        log::info!("Credited {amount} credits to user {user_id}, balance now {balance}");

        Ok(balance)
    }

    async fn insert_transaction(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: i64,
        transaction_type: CreditTransactionType,
        description: &str,
        purchase_id: Option<Uuid>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO credit_transactions (id, user_id, amount, transaction_type, description, purchase_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(amount)
        .bind(transaction_type)
        .bind(description)
        .bind(purchase_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<CreditTransactionResponse>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credit_transactions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let transactions = sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT id, user_id, amount, transaction_type, description, purchase_id, created_at
            FROM credit_transactions
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

        let items: Vec<CreditTransactionResponse> = transactions
            .into_iter()
            .map(CreditTransactionResponse::from)
            .collect();

        Ok(PaginatedResponse::new(items, params, total))
    }
}

/// Outcome of the conditional debit UPDATE. No returned row means the user is
/// unknown or the balance is below the amount; nothing was changed, and the
/// error propagates before any ledger row is written.
fn debit_balance(updated: Option<i64>) -> AppResult<i64> {
    updated.ok_or_else(|| {
        AppError::InsufficientCredits("Nu ai suficiente credite magice!".to_string())
    })
}

/// How much of a credit reverses `total_credits_used`. Only refunds do, so a
/// debit/refund pair nets to zero on both counters.
fn usage_reversal(transaction_type: CreditTransactionType, amount: i64) -> i64 {
    match transaction_type {
        CreditTransactionType::Refund => amount,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_without_matching_row_is_refused() {
        let err = debit_balance(None).unwrap_err();
        assert!(matches!(err, AppError::InsufficientCredits(_)));

        assert_eq!(debit_balance(Some(40)).unwrap(), 40);
    }

    #[test]
    fn only_refunds_reverse_the_usage_counter() {
        assert_eq!(usage_reversal(CreditTransactionType::Refund, 10), 10);
        assert_eq!(usage_reversal(CreditTransactionType::Purchase, 10), 0);
        assert_eq!(usage_reversal(CreditTransactionType::Bonus, 10), 0);
        assert_eq!(usage_reversal(CreditTransactionType::GenerationUse, 10), 0);
    }
}
