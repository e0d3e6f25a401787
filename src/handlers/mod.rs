use actix_web::{HttpMessage, HttpRequest};
use uuid::Uuid;

pub mod auth;
pub mod gallery;
pub mod generation;
pub mod purchase;
pub mod storage;
pub mod story;
pub mod user;
pub mod webhook;

pub use auth::auth_config;
pub use gallery::gallery_config;
pub use generation::generation_config;
pub use purchase::purchase_config;
pub use storage::storage_config;
pub use story::story_config;
pub use user::user_config;
pub use webhook::webhook_config;

/// The authenticated user id, placed in the request extensions by the auth
/// middleware.
pub(crate) fn get_user_id_from_request(req: &HttpRequest) -> Option<Uuid> {
    req.extensions().get::<Uuid>().copied()
}
