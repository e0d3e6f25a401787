use crate::models::*;
use crate::services::StoryService;
use actix_web::{web, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/story",
    tag = "story",
    request_body = StoryRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Poveste generată", body = StoryResponse),
        (status = 400, description = "Date invalide"),
        (status = 401, description = "Neautorizat")
    )
)]
pub async fn tell_story(
    story_service: web::Data<StoryService>,
    request: web::Json<StoryRequest>,
) -> Result<HttpResponse> {
    match story_service.tell_story(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn story_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/story", web::post().to(tell_story));
}
