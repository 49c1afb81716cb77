pub mod auth;
pub mod category;
pub mod order;
pub mod pagination;
pub mod product;
pub mod review;
pub mod user;

pub use auth::*;
pub use category::*;
pub use order::*;
pub use pagination::*;
pub use product::*;
pub use review::*;
pub use user::*;
