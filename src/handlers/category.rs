use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

use super::{current_user, require_admin};
use crate::models::*;
use crate::services::CategoryService;

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "category",
    responses(
        (status = 200, description = "All categories")
    )
)]
pub async fn get_all_categories(
    category_service: web::Data<CategoryService>,
) -> Result<HttpResponse> {
    match category_service.get_all_categories().await {
        Ok(categories) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "results": categories.len(),
            "data": { "categories": categories }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "category",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category detail", body = CategoryResponse),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category_by_id(
    category_service: web::Data<CategoryService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match category_service.get_category_by_id(path.into_inner()).await {
        Ok(category) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "category": category }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "category",
    request_body = CreateCategoryRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Name missing or already taken"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_category(
    category_service: web::Data<CategoryService>,
    req: HttpRequest,
    request: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };
    if let Err(e) = require_admin(&caller) {
        return Ok(e.error_response());
    }

    match category_service.create_category(request.into_inner()).await {
        Ok(category) => Ok(HttpResponse::Created().json(json!({
            "status": "success",
            "data": { "category": category }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "category",
    params(("id" = i64, Path, description = "Category id")),
    request_body = UpdateCategoryRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn update_category(
    category_service: web::Data<CategoryService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateCategoryRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };
    if let Err(e) = require_admin(&caller) {
        return Ok(e.error_response());
    }

    match category_service
        .update_category(path.into_inner(), request.into_inner())
        .await
    {
        Ok(category) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "category": category }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "category",
    params(("id" = i64, Path, description = "Category id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 400, description = "Category still has products"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    category_service: web::Data<CategoryService>,
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

    match category_service.delete_category(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn category_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .route("", web::get().to(get_all_categories))
            .route("", web::post().to(create_category))
            .route("/{id}", web::get().to(get_category_by_id))
            .route("/{id}", web::put().to(update_category))
            .route("/{id}", web::delete().to(delete_category)),
    );
}
