use crate::error::AppResult;
use crate::external::stripe::StripeService;
use crate::services::PurchaseService;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::{error, info, warn};
use stripe::{Event, EventObject, EventType};

/// Stripe webhook endpoint. Signature failures are rejected; processing
/// failures after a valid signature are acknowledged with 200 so Stripe does
/// not retry an event we already consumed, and the error is logged instead.
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    stripe_service: web::Data<StripeService>,
    purchase_service: web::Data<PurchaseService>,
) -> Result<HttpResponse> {
    let signature = match req.headers().get("stripe-signature") {
        Some(sig) => sig.to_str().unwrap_or(""),
        None => {
            warn!("Missing Stripe-Signature header");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Missing Stripe-Signature header"
            })));
        }
    };

    let payload = std::str::from_utf8(&body).map_err(|_| {
        error!("Invalid UTF-8 in webhook payload");
        actix_web::error::ErrorBadRequest("Invalid payload encoding")
    })?;

    let event = match stripe_service.verify_webhook(payload, signature) {
        Ok(event) => event,
        Err(e) => {
            error!("Webhook signature verification failed: {e}");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid signature"
            })));
        }
    };

    info!("Received Stripe webhook event: {} ({})", event.type_, event.id);

    match handle_stripe_event(event, &purchase_service).await {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "received": true
        }))),
        Err(e) => {
            error!("Failed to process webhook event: {e}");
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "received": true,
                "error": format!("Processing failed: {}", e)
            })))
        }
    }
}

async fn handle_stripe_event(event: Event, purchase_service: &PurchaseService) -> AppResult<()> {
    match event.type_ {
        EventType::CheckoutSessionCompleted => {
            if let EventObject::CheckoutSession(session) = event.data.object {
                purchase_service.handle_checkout_completed(session).await?;
            }
            Ok(())
        }
        EventType::CheckoutSessionExpired => {
            if let EventObject::CheckoutSession(session) = event.data.object {
                purchase_service.handle_checkout_expired(session).await?;
            }
            Ok(())
        }
        _ => {
            info!("Unhandled event type: {:?}", event.type_);
            Ok(())
        }
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/stripe", web::post().to(stripe_webhook)));
}
