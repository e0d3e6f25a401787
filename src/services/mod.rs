pub mod auth_service;
pub mod credit_service;
pub mod generation_service;
pub mod marketplace_service;
pub mod purchase_service;
pub mod story_service;
pub mod user_service;

pub use auth_service::*;
pub use credit_service::*;
pub use generation_service::*;
pub use marketplace_service::*;
pub use purchase_service::*;
pub use story_service::*;
pub use user_service::*;
