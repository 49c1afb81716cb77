pub mod auth;
pub mod category;
pub mod order;
pub mod product;
pub mod review;
pub mod user;

pub use auth::auth_config;
pub use category::category_config;
pub use order::order_config;
pub use product::product_config;
pub use review::review_config;
pub use user::user_config;

use crate::error::{AppError, AppResult};
use crate::middlewares::CurrentUser;
use actix_web::{HttpMessage, HttpRequest};

/// Identity placed into extensions by the auth middleware. Absent only on
/// routes the middleware let through unauthenticated.
pub(crate) fn current_user(req: &HttpRequest) -> AppResult<CurrentUser> {
    req.extensions()
        .get::<CurrentUser>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))
}

pub(crate) fn require_admin(caller: &CurrentUser) -> AppResult<()> {
    if caller.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "This action requires administrator privileges".to_string(),
        ))
    }
}
