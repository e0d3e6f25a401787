use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::{CreditService, PurchaseService, UserService};
use crate::utils::PaginationParams;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/user/me",
    tag = "user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profilul utilizatorului", body = UserResponse),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn get_me(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match user_service.get_profile(user_id).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": user
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/user/transactions",
    tag = "user",
    params(
        ("page" = Option<u32>, Query, description = "Pagina"),
        ("per_page" = Option<u32>, Query, description = "Elemente pe pagină")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Istoricul de credite"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn get_transactions(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match credit_service
        .list_transactions(user_id, &query.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/user/purchases",
    tag = "user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Achizițiile finalizate"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn get_purchases(
    purchase_service: web::Data<PurchaseService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match purchase_service.history(user_id).await {
        Ok(purchases) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": purchases
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/user/billing",
    tag = "user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Detaliile de facturare, sau null"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn get_billing(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match user_service.get_billing_details(user_id).await {
        Ok(details) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": details
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/user/billing",
    tag = "user",
    request_body = BillingDetailsRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Detalii de facturare salvate", body = BillingDetails),
        (status = 400, description = "Date invalide"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn save_billing(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<BillingDetailsRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match user_service
        .save_billing_details(user_id, request.into_inner())
        .await
    {
        Ok(details) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": details
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .route("/me", web::get().to(get_me))
            .route("/transactions", web::get().to(get_transactions))
            .route("/purchases", web::get().to(get_purchases))
            .route("/billing", web::get().to(get_billing))
            .route("/billing", web::post().to(save_billing)),
    );
}
