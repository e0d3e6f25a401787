use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::{BuyModelRequest, GenerationService, MarketplaceService};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

const GALLERY_LIMIT: i64 = 60;

#[utoipa::path(
    get,
    path = "/gallery",
    tag = "gallery",
    responses(
        (status = 200, description = "Galeria publică de jucării")
    )
)]
pub async fn get_gallery(
    generation_service: web::Data<GenerationService>,
) -> Result<HttpResponse> {
    match generation_service.list_public_gallery(GALLERY_LIMIT).await {
        Ok(items) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": items
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/gallery/buy",
    tag = "gallery",
    request_body = BuyModelRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Model cumpărat", body = GenerationResponse),
        (status = 400, description = "Date invalide"),
        (status = 402, description = "Credite insuficiente"),
        (status = 404, description = "Modelul nu are fișier GLB"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn buy_model(
    marketplace_service: web::Data<MarketplaceService>,
    req: HttpRequest,
    request: web::Json<BuyModelRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match marketplace_service.buy(user_id, request.into_inner()).await {
        Ok(generation) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": generation
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn gallery_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gallery")
            .route("", web::get().to(get_gallery))
            .route("/buy", web::post().to(buy_model)),
    );
}
