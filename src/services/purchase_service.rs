use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::external::oblio::{CreateInvoiceParams, InvoiceClient, InvoiceProduct, OblioService};
use crate::external::stripe::{CheckoutSessionParams, StripeService};
use crate::models::{
    get_credit_package_by_id, BillingDetails, CheckoutResponse, CreateCheckoutRequest,
    CreditTransactionType, Purchase, PurchaseResponse, PurchaseStatus, User,
};
use crate::services::CreditService;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata a completed checkout session must carry to be credited.
#[derive(Debug, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub purchase_id: Uuid,
    pub user_id: Uuid,
    pub credits: i64,
}

#[derive(Clone)]
pub struct PurchaseService {
    pool: PgPool,
    stripe: StripeService,
    oblio: OblioService,
    app: AppConfig,
}

impl PurchaseService {
    pub fn new(pool: PgPool, stripe: StripeService, oblio: OblioService, app: AppConfig) -> Self {
        Self {
            pool,
            stripe,
            oblio,
            app,
        }
    }

    /// Create a pending purchase and a Stripe checkout session for it. The
    /// purchase id travels in the session metadata so the webhook can find
    /// its way back.
    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        request: CreateCheckoutRequest,
    ) -> AppResult<CheckoutResponse> {
        let package = get_credit_package_by_id(&request.package_id).ok_or_else(|| {
            AppError::ValidationError(format!("Pachet necunoscut: {}", request.package_id))
        })?;

        let user = self.get_user(user_id).await?;

        let purchase_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO purchases (id, user_id, amount, credits, currency, status)
            VALUES ($1, $2, $3, $4, 'RON', $5)
            "#,
        )
        .bind(purchase_id)
        .bind(user_id)
        .bind(package.price)
        .bind(package.total_credits())
        .bind(PurchaseStatus::Pending)
        .execute(&self.pool)
        .await?;

        let base = self.app.base_url.trim_end_matches('/');
        let session = self
            .stripe
            .create_checkout_session(CheckoutSessionParams {
                purchase_id,
                user_id,
                credits: package.total_credits(),
                package_id: package.id.to_string(),
                package_name: package.name.to_string(),
                description: format!("{} credite magice pentru jucării 3D", package.total_credits()),
                unit_amount: package.price,
                customer_email: user.email,
                success_url: format!(
                    "{base}/parents?success=true&session_id={{CHECKOUT_SESSION_ID}}"
                ),
                cancel_url: format!("{base}/parents?canceled=true"),
            })
            .await?;

        sqlx::query("UPDATE purchases SET stripe_session_id = $1 WHERE id = $2")
            .bind(&session.id)
            .bind(purchase_id)
            .execute(&self.pool)
            .await?;

        log::info!("Created checkout session {} for purchase {purchase_id}", session.id);

        Ok(CheckoutResponse {
            purchase_id,
            url: session.url,
        })
    }

    /// `checkout.session.completed`: grant the credits exactly once. The
    /// `pending -> completed` transition and the ledger credit commit in one
    /// transaction; a replayed event loses the compare-and-set and does
    /// nothing. Invoicing runs after the commit and never blocks the grant.
    pub async fn handle_checkout_completed(&self, session: stripe::CheckoutSession) -> AppResult<()> {
        if !credits_grantable(session.payment_status) {
            log::info!(
                "Ignoring completed session {} with payment_status {:?}",
                session.id,
                session.payment_status
            );
            return Ok(());
        }

        let metadata = parse_checkout_metadata(
            session.metadata.as_ref().unwrap_or(&HashMap::new()),
            session.client_reference_id.as_deref(),
        )
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "Checkout session {} is missing purchase metadata",
                session.id
            ))
        })?;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE purchases
            SET status = $1, completed_at = now()
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(PurchaseStatus::Completed)
        .bind(metadata.purchase_id)
        .bind(PurchaseStatus::Pending)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Replayed webhook or a purchase already settled; nothing to grant.
            log::info!(
                "Purchase {} is no longer pending, skipping credit grant",
                metadata.purchase_id
            );
            return Ok(());
        }

        CreditService::credit_in_tx(
            &mut tx,
            metadata.user_id,
            metadata.credits,
            CreditTransactionType::Purchase,
            &format!("Achiziție credite - {} credite", metadata.credits),
            Some(metadata.purchase_id),
        )
        .await?;

        tx.commit().await?;

        log::info!(
            "Granted {} credits to user {} for purchase {}",
            metadata.credits,
            metadata.user_id,
            metadata.purchase_id
        );

        // Best effort: a failed invoice never undoes the paid credits.
        if let Err(e) = self.issue_invoice(metadata.purchase_id, metadata.user_id).await {
            log::error!(
                "Invoice issuing failed for purchase {}: {e}",
                metadata.purchase_id
            );
        }

        Ok(())
    }

    /// `checkout.session.expired`: close the pending purchase. No credits
    /// moved, so there is nothing to compensate.
    pub async fn handle_checkout_expired(&self, session: stripe::CheckoutSession) -> AppResult<()> {
        let Some(metadata) = parse_checkout_metadata(
            session.metadata.as_ref().unwrap_or(&HashMap::new()),
            session.client_reference_id.as_deref(),
        ) else {
            log::warn!("Expired session {} carries no purchase metadata", session.id);
            return Ok(());
        };

        let updated = sqlx::query(
            r#"
            UPDATE purchases
            SET status = $1, completed_at = now()
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(PurchaseStatus::Failed)
        .bind(metadata.purchase_id)
        .bind(PurchaseStatus::Pending)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            log::info!("Marked expired purchase {} as failed", metadata.purchase_id);
        }

        Ok(())
    }

    async fn issue_invoice(&self, purchase_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let Some(billing) = self.get_billing_details(user_id).await? else {
            log::info!("User {user_id} has no billing profile, skipping invoice");
            return Ok(());
        };

        let purchase = self.get_purchase(purchase_id).await?;
        let user = self.get_user(user_id).await?;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let params = CreateInvoiceParams {
            currency: purchase.currency.clone(),
            language: "RO".to_string(),
            issue_date: today.clone(),
            due_date: today,
            products: vec![InvoiceProduct {
                name: format!("Pachet Credite Magice ({} Credite)", purchase.credits),
                price: purchase.amount as f64 / 100.0,
                quantity: 1,
                measuring_unit_name: "buc".to_string(),
                currency: purchase.currency.clone(),
                vat_name: "Neplatitor TVA".to_string(),
                vat_percentage: 0.0,
            }],
            client: build_invoice_client(&billing, &user.email),
        };

        let invoice = self.oblio.create_invoice(params).await?;

        sqlx::query(
            r#"
            UPDATE purchases
            SET invoice_series = $1, invoice_number = $2, invoice_url = $3
            WHERE id = $4
            "#,
        )
        .bind(&invoice.series_name)
        .bind(&invoice.number)
        .bind(&invoice.link)
        .bind(purchase_id)
        .execute(&self.pool)
        .await?;

        log::info!(
            "Issued invoice {}{} for purchase {purchase_id}",
            invoice.series_name.as_deref().unwrap_or(""),
            invoice.number.as_deref().unwrap_or("?")
        );

        Ok(())
    }

    /// Completed purchases, newest first.
    pub async fn history(&self, user_id: Uuid) -> AppResult<Vec<PurchaseResponse>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, user_id, amount, credits, currency, status, stripe_session_id,
                   invoice_series, invoice_number, invoice_url, created_at, completed_at
            FROM purchases
            WHERE user_id = $1 AND status = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(PurchaseStatus::Completed)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases.into_iter().map(PurchaseResponse::from).collect())
    }

    async fn get_purchase(&self, purchase_id: Uuid) -> AppResult<Purchase> {
        sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, user_id, amount, credits, currency, status, stripe_session_id,
                   invoice_series, invoice_number, invoice_url, created_at, completed_at
            FROM purchases
            WHERE id = $1
            "#,
        )
        .bind(purchase_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase not found".to_string()))
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
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn get_billing_details(&self, user_id: Uuid) -> AppResult<Option<BillingDetails>> {
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
}

/// Only sessions Stripe reports as paid move credits; `completed` alone is
/// not enough (delayed payment methods complete unpaid).
pub fn credits_grantable(payment_status: stripe::CheckoutSessionPaymentStatus) -> bool {
    payment_status == stripe::CheckoutSessionPaymentStatus::Paid
}

/// Pull the purchase correlation out of a checkout session. Prefers the
/// metadata entries; falls back to `client_reference_id` for the purchase id.
pub fn parse_checkout_metadata(
    metadata: &HashMap<String, String>,
    client_reference_id: Option<&str>,
) -> Option<CheckoutMetadata> {
    let purchase_id = metadata
        .get("purchase_id")
        .map(String::as_str)
        .or(client_reference_id)
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let user_id = metadata.get("user_id").and_then(|s| Uuid::parse_str(s).ok())?;
    let credits = metadata.get("credits").and_then(|s| s.parse::<i64>().ok())?;

    if credits <= 0 {
        return None;
    }

    Some(CheckoutMetadata {
        purchase_id,
        user_id,
        credits,
    })
}

/// Invoice recipient from the billing profile. Company profiles bill to the
/// company name and CUI; personal ones to the person, with the company-name
/// fallback covering half-filled company profiles.
pub fn build_invoice_client(billing: &BillingDetails, user_email: &str) -> InvoiceClient {
    if billing.billing_type == "company" {
        InvoiceClient {
            cif: billing.cui.clone().unwrap_or_default(),
            name: billing
                .company_name
                .clone()
                .unwrap_or_else(|| format!("{} {}", billing.first_name, billing.last_name)),
            rc: billing.reg_com.clone().unwrap_or_default(),
            address: billing.address.clone(),
            state: billing.state.clone().unwrap_or_default(),
            city: billing.city.clone(),
            country: billing.country.clone(),
            email: Some(user_email.to_string()),
            save: true,
        }
    } else {
        InvoiceClient {
            cif: String::new(),
            name: format!("{} {}", billing.first_name, billing.last_name),
            rc: String::new(),
            address: billing.address.clone(),
            state: billing.state.clone().unwrap_or_default(),
            city: billing.city.clone(),
            country: billing.country.clone(),
            email: Some(user_email.to_string()),
            save: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn only_paid_sessions_are_grantable() {
        use stripe::CheckoutSessionPaymentStatus::*;
        assert!(credits_grantable(Paid));
        assert!(!credits_grantable(Unpaid));
        assert!(!credits_grantable(NoPaymentRequired));
    }

    #[test]
    fn parses_complete_metadata() {
        let purchase_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let md = metadata(&[
            ("purchase_id", &purchase_id.to_string()),
            ("user_id", &user_id.to_string()),
            ("credits", "200"),
        ]);

        let parsed = parse_checkout_metadata(&md, None).unwrap();
        assert_eq!(parsed.purchase_id, purchase_id);
        assert_eq!(parsed.user_id, user_id);
        assert_eq!(parsed.credits, 200);
    }

    #[test]
    fn falls_back_to_client_reference_id() {
        let purchase_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let md = metadata(&[("user_id", &user_id.to_string()), ("credits", "50")]);

        let parsed =
            parse_checkout_metadata(&md, Some(&purchase_id.to_string())).unwrap();
        assert_eq!(parsed.purchase_id, purchase_id);
    }

    #[test]
    fn rejects_missing_or_bad_credits() {
        let purchase_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let md = metadata(&[
            ("purchase_id", &purchase_id.to_string()),
            ("user_id", &user_id.to_string()),
        ]);
        assert!(parse_checkout_metadata(&md, None).is_none());

        let md = metadata(&[
            ("purchase_id", &purchase_id.to_string()),
            ("user_id", &user_id.to_string()),
            ("credits", "-5"),
        ]);
        assert!(parse_checkout_metadata(&md, None).is_none());
    }

    fn billing(billing_type: &str) -> BillingDetails {
        BillingDetails {
            user_id: Uuid::new_v4(),
            billing_type: billing_type.to_string(),
            first_name: "Ion".to_string(),
            last_name: "Ionescu".to_string(),
            company_name: Some("Jucării SRL".to_string()),
            cui: Some("RO12345678".to_string()),
            reg_com: Some("J12/345/2020".to_string()),
            address: "Str. Fabricii 10".to_string(),
            city: "Cluj-Napoca".to_string(),
            state: Some("Cluj".to_string()),
            country: "Romania".to_string(),
            zip: Some("400000".to_string()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn invoice_client_uses_company_profile() {
        let client = build_invoice_client(&billing("company"), "ion@example.com");
        assert_eq!(client.name, "Jucării SRL");
        assert_eq!(client.cif, "RO12345678");
        assert_eq!(client.rc, "J12/345/2020");
        assert_eq!(client.email.as_deref(), Some("ion@example.com"));
    }

    #[test]
    fn invoice_client_uses_person_for_personal_billing() {
        let client = build_invoice_client(&billing("personal"), "ion@example.com");
        assert_eq!(client.name, "Ion Ionescu");
        assert_eq!(client.cif, "");
        assert_eq!(client.rc, "");
    }
}
