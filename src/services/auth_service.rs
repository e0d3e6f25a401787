use crate::error::{AppError, AppResult};
use crate::models::{
    AuthResponse, CreditTransactionType, LoginRequest, RefreshRequest, RegisterRequest, User,
    UserResponse, SIGNUP_BONUS_CREDITS,
};
use crate::services::CreditService;
use crate::utils::jwt::JwtService;
use crate::utils::password::{hash_password, validate_password, verify_password};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt: JwtService) -> Self {
        Self { pool, jwt }
    }

    /// Register a new account. The user row and the welcome-bonus ledger
    /// entry commit together.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::ValidationError(
                "Adresa de email nu este validă".to_string(),
            ));
        }
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Numele este obligatoriu".to_string()));
        }
        validate_password(&request.password)?;

        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(
                "Există deja un cont cu acest email".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let user_id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, credits)
            VALUES ($1, $2, $3, $4, 0)
            "#,
        )
        .bind(user_id)
        .bind(&email)
        .bind(request.name.trim())
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

        CreditService::credit_in_tx(
            &mut tx,
            user_id,
            SIGNUP_BONUS_CREDITS,
            CreditTransactionType::Bonus,
            "Bun venit! Credite magice cadou",
            None,
        )
        .await?;

        tx.commit().await?;

        log::info!("Registered user {user_id} ({email})");

        let user = self.get_user(user_id).await?;
        self.build_auth_response(user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, credits, total_credits_used,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::AuthError("Email sau parolă greșită".to_string()))?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::AuthError("Email sau parolă greșită".to_string()));
        }

        self.build_auth_response(user)
    }

    /// Exchange a refresh token for a fresh access/refresh pair.
    pub async fn refresh(&self, request: RefreshRequest) -> AppResult<AuthResponse> {
        let claims = self.jwt.verify_refresh_token(&request.refresh_token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        let user = self.get_user(user_id).await?;
        self.build_auth_response(user)
    }

    fn build_auth_response(&self, user: User) -> AppResult<AuthResponse> {
        let access_token = self.jwt.generate_access_token(user.id)?;
        let refresh_token = self.jwt.generate_refresh_token(user.id)?;

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
            expires_in: self.jwt.get_access_token_expires_in(),
        })
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(
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
        .ok_or_else(|| AppError::AuthError("Contul nu mai există".to_string()))
    }
}
