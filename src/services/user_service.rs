use crate::error::{AppError, AppResult};
use crate::models::{BillingDetails, BillingDetailsRequest, User, UserResponse};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<UserResponse> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, credits, total_credits_used,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(UserResponse::from(user))
    }

    pub async fn get_billing_details(&self, user_id: Uuid) -> AppResult<Option<BillingDetails>> {
        Ok(sqlx::query_as::<_, BillingDetails>(
            r#"
            SELECT user_id, billing_type, first_name, last_name, company_name, cui, reg_com,
                   address, city, state, country, zip, updated_at
            FROM billing_details
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Upsert the invoicing profile; one row per user.
    pub async fn save_billing_details(
        &self,
        user_id: Uuid,
        request: BillingDetailsRequest,
    ) -> AppResult<BillingDetails> {
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Numele și prenumele sunt obligatorii".to_string(),
            ));
        }
        if request.billing_type == "company"
            && request.cui.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(AppError::ValidationError(
                "CUI-ul este obligatoriu pentru facturare pe firmă".to_string(),
            ));
        }

        let details = sqlx::query_as::<_, BillingDetails>(
            r#"
            INSERT INTO billing_details
                (user_id, billing_type, first_name, last_name, company_name, cui, reg_com,
                 address, city, state, country, zip)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (user_id) DO UPDATE SET
                billing_type = EXCLUDED.billing_type,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                company_name = EXCLUDED.company_name,
                cui = EXCLUDED.cui,
                reg_com = EXCLUDED.reg_com,
                address = EXCLUDED.address,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                country = EXCLUDED.country,
                zip = EXCLUDED.zip,
                updated_at = now()
            RETURNING user_id, billing_type, first_name, last_name, company_name, cui, reg_com,
                      address, city, state, country, zip, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&request.billing_type)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(&request.company_name)
        .bind(&request.cui)
        .bind(&request.reg_com)
        .bind(&request.address)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.country)
        .bind(&request.zip)
        .fetch_one(&self.pool)
        .await?;

        Ok(details)
    }
}
