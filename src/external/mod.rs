pub mod oblio;
pub mod replicate;
pub mod sketchfab;
pub mod storage;
pub mod stripe;

pub use self::oblio::*;
pub use self::replicate::*;
pub use self::sketchfab::*;
pub use self::storage::*;
pub use self::stripe::*;
