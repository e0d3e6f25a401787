use crate::config::StripeConfig;
use crate::error::{AppError, AppResult};
use std::collections::HashMap;
use stripe::{
    CheckoutSession, CheckoutSessionMode, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionPaymentMethodTypes, Currency, Event, Webhook,
};
use uuid::Uuid;

/// Everything the checkout session needs to correlate the eventual webhook
/// back to a pending purchase.
pub struct CheckoutSessionParams {
    pub purchase_id: Uuid,
    pub user_id: Uuid,
    pub credits: i64,
    pub package_id: String,
    pub package_name: String,
    pub description: String,
    /// Unit amount in bani (RON cents).
    pub unit_amount: i64,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug)]
pub struct CheckoutSessionInfo {
    pub id: String,
    pub url: String,
}

#[derive(Clone)]
pub struct StripeService {
    client: Client,
    webhook_secret: String,
}

impl StripeService {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(config.secret_key),
            webhook_secret: config.webhook_secret,
        }
    }

    pub async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> AppResult<CheckoutSessionInfo> {
        let purchase_id = params.purchase_id.to_string();
        let metadata = HashMap::from([
            ("purchase_id".to_string(), purchase_id.clone()),
            ("user_id".to_string(), params.user_id.to_string()),
            ("credits".to_string(), params.credits.to_string()),
            ("package_id".to_string(), params.package_id.clone()),
        ]);

        let mut create_session = CreateCheckoutSession::new();
        create_session.mode = Some(CheckoutSessionMode::Payment);
        create_session.payment_method_types =
            Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);
        create_session.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::RON,
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: format!("Pachet {}", params.package_name),
                    description: Some(params.description.clone()),
                    ..Default::default()
                }),
                unit_amount: Some(params.unit_amount),
                ..Default::default()
            }),
            quantity: Some(1),
            ..Default::default()
        }]);
        create_session.success_url = Some(&params.success_url);
        create_session.cancel_url = Some(&params.cancel_url);
        create_session.customer_email = Some(&params.customer_email);
        create_session.client_reference_id = Some(&purchase_id);
        create_session.metadata = Some(metadata);

        let session = CheckoutSession::create(&self.client, create_session).await?;

        let url = session.url.ok_or_else(|| {
            AppError::ExternalApiError("Checkout session has no redirect URL".to_string())
        })?;

        Ok(CheckoutSessionInfo {
            id: session.id.to_string(),
            url,
        })
    }

    /// Verify the webhook signature against the shared secret and parse the
    /// event. Nothing downstream runs on an unverified payload.
    pub fn verify_webhook(&self, payload: &str, signature: &str) -> AppResult<Event> {
        Webhook::construct_event(payload, signature, &self.webhook_secret)
            .map_err(|e| AppError::AuthError(format!("Invalid webhook signature: {e}")))
    }
}
