use crate::error::AppError;
use crate::external::storage::StorageService;
use actix_web::{web, HttpResponse, ResponseError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ProxyModelQuery {
    pub url: String,
}

/// Infer a content type from the key when storage kept none.
fn content_type_for_key(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("glb") => "model/gltf-binary",
        Some("gltf") => "model/gltf+json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[utoipa::path(
    get,
    path = "/storage/{key}",
    tag = "storage",
    params(("key" = String, Path, description = "Cheia obiectului")),
    responses(
        (status = 200, description = "Conținutul fișierului"),
        (status = 404, description = "Fișier inexistent")
    )
)]
pub async fn serve_object(
    storage_service: web::Data<StorageService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let key = path.into_inner();

    match storage_service.get_object(&key).await {
        Ok((bytes, content_type)) => {
            let content_type =
                content_type.unwrap_or_else(|| content_type_for_key(&key).to_string());
            // Model files are immutable once fulfilled.
            Ok(HttpResponse::Ok()
                .content_type(content_type)
                .insert_header(("Cache-Control", "public, max-age=31536000, immutable"))
                .insert_header(("Access-Control-Allow-Origin", "*"))
                .body(bytes))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/proxy-model",
    tag = "storage",
    params(("url" = String, Query, description = "URL-ul fișierului extern")),
    responses(
        (status = 200, description = "Conținutul fișierului"),
        (status = 400, description = "URL invalid")
    )
)]
pub async fn proxy_model(
    storage_service: web::Data<StorageService>,
    query: web::Query<ProxyModelQuery>,
) -> Result<HttpResponse> {
    let url = query.into_inner().url;

    if !url.starts_with("https://") {
        let e = AppError::ValidationError("Only https URLs can be proxied".to_string());
        return Ok(e.error_response());
    }

    match storage_service.fetch_remote(&url).await {
        Ok((bytes, content_type)) => Ok(HttpResponse::Ok()
            .content_type(content_type.unwrap_or_else(|| "model/gltf-binary".to_string()))
            .insert_header(("Access-Control-Allow-Origin", "*"))
            .body(bytes)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn storage_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/storage").route("/{key:.*}", web::get().to(serve_object)))
        .route("/proxy-model", web::get().to(proxy_model));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type_for_key("generations/a.glb"), "model/gltf-binary");
        assert_eq!(content_type_for_key("images/photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for_key("no-extension"), "application/octet-stream");
    }
}
