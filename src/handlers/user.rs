use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

use super::{current_user, require_admin};
use crate::models::*;
use crate::services::UserService;

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's profile", body = UserResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_me(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service.get_me(caller.id).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "user": user }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/api/users/update-me",
    tag = "user",
    request_body = UpdateMeRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Password updates are not accepted here")
    )
)]
pub async fn update_me(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<UpdateMeRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service
        .update_me(caller.id, request.into_inner())
        .await
    {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "user": user }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/delete-me",
    tag = "user",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn delete_me(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service.delete_me(caller.id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn get_all_users(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };
    if let Err(e) = require_admin(&caller) {
        return Ok(e.error_response());
    }

    match user_service.get_all_users().await {
        Ok(users) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "results": users.len(),
            "data": { "users": users }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "user",
    params(("id" = i64, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User detail", body = UserResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_by_id(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };
    if let Err(e) = require_admin(&caller) {
        return Ok(e.error_response());
    }

    match user_service.get_user_by_id(path.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "user": user }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "user",
    params(("id" = i64, Path, description = "User id")),
    request_body = AdminUpdateUserRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 403, description = "Admin only, or self-demotion attempt"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<AdminUpdateUserRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };
    if let Err(e) = require_admin(&caller) {
        return Ok(e.error_response());
    }

    match user_service
        .update_user(&caller, path.into_inner(), request.into_inner())
        .await
    {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "user": user }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "user",
    params(("id" = i64, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin only, or self-deletion attempt"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };
    if let Err(e) = require_admin(&caller) {
        return Ok(e.error_response());
    }

    match user_service.delete_user(&caller, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/me", web::get().to(get_me))
            .route("/update-me", web::patch().to(update_me))
            .route("/delete-me", web::delete().to(delete_me))
            .route("", web::get().to(get_all_users))
            .route("/{id}", web::get().to(get_user_by_id))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}", web::delete().to(delete_user)),
    );
}
