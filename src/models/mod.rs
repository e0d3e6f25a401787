pub mod billing_details;
pub mod common;
pub mod credit_package;
pub mod credit_transaction;
pub mod generation;
pub mod purchase;
pub mod story;
pub mod user;

pub use billing_details::*;
pub use common::*;
pub use credit_package::*;
pub use credit_transaction::*;
pub use generation::*;
pub use purchase::*;
pub use story::*;
pub use user::*;
