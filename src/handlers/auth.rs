use actix_web::{web, HttpResponse, ResponseError, Result};
use serde_json::json;

use crate::models::*;
use crate::services::AuthService;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, tokens issued", body = AuthResponse),
        (status = 400, description = "Invalid name, email or password"),
        (status = 400, description = "Email already in use")
    )
)]
pub async fn register(
    auth_service: web::Data<AuthService>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    match auth_service.register(request.into_inner()).await {
        Ok(auth) => Ok(HttpResponse::Created().json(json!({
            "status": "success",
            "data": auth
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    match auth_service.login(request.into_inner()).await {
        Ok(auth) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": auth
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Expired or malformed refresh token")
    )
)]
pub async fn refresh(
    auth_service: web::Data<AuthService>,
    request: web::Json<RefreshRequest>,
) -> Result<HttpResponse> {
    match auth_service.refresh(&request.refresh_token).await {
        Ok(auth) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": auth
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh)),
    );
}
