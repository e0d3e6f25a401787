use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::GenerationService;
use crate::utils::PaginationParams;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/generations",
    tag = "generation",
    request_body = CreateGenerationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Generare pornită", body = GenerationLaunchResponse),
        (status = 400, description = "Date invalide"),
        (status = 402, description = "Credite insuficiente"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn create_generation(
    generation_service: web::Data<GenerationService>,
    req: HttpRequest,
    request: web::Json<CreateGenerationRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match generation_service.launch(user_id, request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/generations",
    tag = "generation",
    params(
        ("page" = Option<u32>, Query, description = "Pagina"),
        ("per_page" = Option<u32>, Query, description = "Elemente pe pagină")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Generările utilizatorului"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn list_generations(
    generation_service: web::Data<GenerationService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match generation_service
        .list_for_user(user_id, &query.into_inner())
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
    path = "/generations/{id}/status",
    tag = "generation",
    params(("id" = Uuid, Path, description = "Id-ul generării")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Starea generării", body = GenerationStatusResponse),
        (status = 403, description = "Generarea altui utilizator"),
        (status = 404, description = "Generare inexistentă"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn get_generation_status(
    generation_service: web::Data<GenerationService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();
    let generation_id = path.into_inner();

    match generation_service.check_status(user_id, generation_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/generations/{id}/visibility",
    tag = "generation",
    params(("id" = Uuid, Path, description = "Id-ul generării")),
    request_body = UpdateVisibilityRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Vizibilitate actualizată"),
        (status = 400, description = "Generarea nu este finalizată"),
        (status = 403, description = "Generarea altui utilizator"),
        (status = 404, description = "Generare inexistentă"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn set_visibility(
    generation_service: web::Data<GenerationService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<UpdateVisibilityRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match generation_service
        .set_visibility(user_id, path.into_inner(), request.is_public)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": null
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/generations/{id}",
    tag = "generation",
    params(("id" = Uuid, Path, description = "Id-ul generării")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Generare ștearsă"),
        (status = 403, description = "Generarea altui utilizator"),
        (status = 404, description = "Generare inexistentă"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn delete_generation(
    generation_service: web::Data<GenerationService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or_default();

    match generation_service.delete(user_id, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": null
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn generation_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/generations")
            .route("", web::post().to(create_generation))
            .route("", web::get().to(list_generations))
            .route("/{id}/status", web::get().to(get_generation_status))
            .route("/{id}/visibility", web::put().to(set_visibility))
            .route("/{id}", web::delete().to(delete_generation)),
    );
}
