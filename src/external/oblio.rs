use crate::config::OblioConfig;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceProduct {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub measuring_unit_name: String,
    pub currency: String,
    pub vat_name: String,
    pub vat_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceClient {
    pub cif: String,
    pub name: String,
    pub rc: String,
    pub address: String,
    pub state: String,
    pub city: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub save: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceParams {
    pub currency: String,
    pub language: String,
    pub issue_date: String,
    pub due_date: String,
    pub products: Vec<InvoiceProduct>,
    pub client: InvoiceClient,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceResult {
    #[serde(rename = "seriesName")]
    pub series_name: Option<String>,
    pub number: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct InvoiceResponse {
    data: Option<InvoiceResult>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Oblio invoicing client. Tokens are cached until 60 seconds before expiry
/// so a burst of webhooks reuses one authorization round-trip.
#[derive(Clone)]
pub struct OblioService {
    client: Client,
    config: OblioConfig,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl OblioService {
    pub fn new(config: OblioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            token: Arc::new(RwLock::new(None)),
        }
    }

    async fn access_token(&self) -> AppResult<String> {
        {
            let cached = self.token.read().await;
            if let Some(cached) = cached.as_ref() {
                if Utc::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let url = format!("{}/api/authorize/token", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "cif": self.config.cif,
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Oblio authorization failed: {error_text}"
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        let expires_in = token_response.expires_in.unwrap_or(3600);

        let cached = CachedToken {
            token: token_response.access_token.clone(),
            expires_at: token_expiry(Utc::now(), expires_in),
        };
        *self.token.write().await = Some(cached);

        Ok(token_response.access_token)
    }

    pub async fn create_invoice(&self, params: CreateInvoiceParams) -> AppResult<InvoiceResult> {
        let token = self.access_token().await?;
        let url = format!("{}/api/docs/invoice", self.config.base_url);

        let mut body = serde_json::to_value(&params)?;
        // cif, series and precision ride alongside the typed params, as the
        // API expects a flat document payload.
        if let Some(map) = body.as_object_mut() {
            map.insert("cif".to_string(), serde_json::json!(self.config.cif));
            map.insert("seriesName".to_string(), serde_json::json!(self.config.series));
            map.insert("precision".to_string(), serde_json::json!(2));
            map.insert("useStock".to_string(), serde_json::json!(false));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Oblio invoice creation failed: {error_text}"
            )));
        }

        let invoice_response: InvoiceResponse = response.json().await?;
        invoice_response.data.ok_or_else(|| {
            AppError::ExternalApiError("Oblio invoice response has no data".to_string())
        })
    }
}

/// Expiry moment for a cached token: provider TTL minus a 60 second safety
/// margin.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    now + Duration::seconds((expires_in - 60).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_expiry_keeps_safety_margin() {
        let now = Utc::now();
        assert_eq!(token_expiry(now, 3600), now + Duration::seconds(3540));
        // A tiny TTL never yields an expiry in the past.
        assert_eq!(token_expiry(now, 30), now);
    }

    #[test]
    fn invoice_payload_serializes_camel_case() {
        let params = CreateInvoiceParams {
            currency: "RON".to_string(),
            language: "RO".to_string(),
            issue_date: "2026-01-15".to_string(),
            due_date: "2026-01-15".to_string(),
            products: vec![InvoiceProduct {
                name: "Pachet Credite Magice (200 Credite)".to_string(),
                price: 80.0,
                quantity: 1,
                measuring_unit_name: "buc".to_string(),
                currency: "RON".to_string(),
                vat_name: "Neplatitor TVA".to_string(),
                vat_percentage: 0.0,
            }],
            client: InvoiceClient {
                cif: String::new(),
                name: "Maria Pop".to_string(),
                rc: String::new(),
                address: "Str. Exemplu 1".to_string(),
                state: "Cluj".to_string(),
                city: "Cluj-Napoca".to_string(),
                country: "ROMANIA".to_string(),
                email: None,
                save: true,
            },
        };

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["issueDate"], "2026-01-15");
        assert_eq!(value["products"][0]["measuringUnitName"], "buc");
        assert_eq!(value["products"][0]["vatName"], "Neplatitor TVA");
        assert!(value["client"].get("email").is_none());
    }
}
