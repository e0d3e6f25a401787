use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::PurchaseService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/purchases/packages",
    tag = "purchase",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pachetele de credite disponibile")
    )
)]
pub async fn get_packages() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": CREDIT_PACKAGES
    })))
}

#[utoipa::path(
    post,
    path = "/purchases/checkout",
    tag = "purchase",
    request_body = CreateCheckoutRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sesiune de plată creată", body = CheckoutResponse),
        (status = 400, description = "Pachet necunoscut"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn create_checkout(
    purchase_service: web::Data<PurchaseService>,
    req: HttpRequest,
    request: web::Json<CreateCheckoutRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match purchase_service
        .create_checkout(user_id, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn purchase_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/purchases")
            .route("/packages", web::get().to(get_packages))
            .route("/checkout", web::post().to(create_checkout)),
    );
}
