use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{OrderStatus, UserRole};
use crate::handlers;
use crate::models::*;

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
        handlers::user::update_me,
        handlers::user::delete_me,
        handlers::user::get_all_users,
        handlers::user::get_user_by_id,
        handlers::user::update_user,
        handlers::user::delete_user,
        handlers::category::get_all_categories,
        handlers::category::get_category_by_id,
        handlers::category::create_category,
        handlers::category::update_category,
        handlers::category::delete_category,
        handlers::product::get_all_products,
        handlers::product::get_my_products,
        handlers::product::get_product_by_id,
        handlers::product::create_product,
        handlers::product::update_product,
        handlers::product::delete_product,
        handlers::order::create_order,
        handlers::order::get_my_orders,
        handlers::order::get_all_orders,
        handlers::order::get_order_by_id,
        handlers::order::cancel_order,
        handlers::order::update_order_status,
        handlers::review::get_all_reviews,
        handlers::review::get_review_by_id,
        handlers::review::create_review,
        handlers::review::update_review,
        handlers::review::delete_review,
    ),
    components(
        schemas(
            UserRole,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthResponse,
            UserResponse,
            UserSummary,
            UpdateMeRequest,
            AdminUpdateUserRequest,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryResponse,
            CategorySummary,
            CreateProductRequest,
            UpdateProductRequest,
            ProductResponse,
            ProductSummary,
            OrderItemRequest,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            OrderItemResponse,
            OrderResponse,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewResponse,
            PaginationInfo,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "user", description = "Profile and user administration"),
        (name = "category", description = "Product category catalog"),
        (name = "product", description = "Producer listings"),
        (name = "order", description = "Order placement and lifecycle"),
        (name = "review", description = "Product reviews"),
    ),
    info(
        title = "Feira Backend API",
        version = "1.0.0",
        description = "REST API for a local producer marketplace"
    ),
    servers(
        (url = "/", description = "Local server")
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
