use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::services::BuyModelRequest;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::user::get_me,
        handlers::user::get_transactions,
        handlers::user::get_purchases,
        handlers::user::get_billing,
        handlers::user::save_billing,
        handlers::generation::create_generation,
        handlers::generation::list_generations,
        handlers::generation::get_generation_status,
        handlers::generation::set_visibility,
        handlers::generation::delete_generation,
        handlers::gallery::get_gallery,
        handlers::gallery::buy_model,
        handlers::purchase::get_packages,
        handlers::purchase::create_checkout,
        handlers::story::tell_story,
        handlers::storage::serve_object,
        handlers::storage::proxy_model,
    ),
    components(
        schemas(
            User,
            UserResponse,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthResponse,
            CreditPackage,
            CreditTransactionType,
            CreditTransactionResponse,
            GenerationStatus,
            GenerationMode,
            CreateGenerationRequest,
            UpdateVisibilityRequest,
            GenerationLaunchResponse,
            GenerationStatusResponse,
            GenerationResponse,
            PurchaseStatus,
            CreateCheckoutRequest,
            CheckoutResponse,
            PurchaseResponse,
            BillingDetails,
            BillingDetailsRequest,
            BuyModelRequest,
            StoryRequest,
            StoryResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "user", description = "User profile, credits and billing API"),
        (name = "generation", description = "3D toy generation API"),
        (name = "gallery", description = "Public gallery and marketplace API"),
        (name = "purchase", description = "Credit packages and checkout API"),
        (name = "story", description = "Story generation API"),
        (name = "storage", description = "Stored asset serving API"),
    ),
    info(
        title = "Kidmy Backend API",
        version = "1.0.0",
        description = "Kidmy creative platform REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
