use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

use super::current_user;
use crate::models::*;
use crate::services::ProductService;

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "product",
    params(ProductQuery),
    responses(
        (status = 200, description = "Filtered, paginated product catalog")
    )
)]
pub async fn get_all_products(
    product_service: web::Data<ProductService>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse> {
    match product_service.get_all_products(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "results": page.items.len(),
            "pagination": page.pagination,
            "data": { "products": page.items }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/products/my-products",
    tag = "product",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's own listings"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_my_products(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match product_service.get_my_products(caller.id).await {
        Ok(products) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "results": products.len(),
            "data": { "products": products }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "product",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product detail", body = ProductResponse),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product_by_id(
    product_service: web::Data<ProductService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match product_service.get_product_by_id(path.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "product": product }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "product",
    request_body = CreateProductRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Product listed", body = ProductResponse),
        (status = 400, description = "Invalid name, price or stock"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn create_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    request: web::Json<CreateProductRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match product_service
        .create_product(caller.id, request.into_inner())
        .await
    {
        Ok(product) => Ok(HttpResponse::Created().json(json!({
            "status": "success",
            "data": { "product": product }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "product",
    params(("id" = i64, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn update_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match product_service
        .update_product(&caller, path.into_inner(), request.into_inner())
        .await
    {
        Ok(product) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "product": product }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "product",
    params(("id" = i64, Path, description = "Product id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Product delisted"),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn delete_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match product_service
        .delete_product(&caller, path.into_inner())
        .await
    {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn product_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(get_all_products))
            .route("", web::post().to(create_product))
            .route("/my-products", web::get().to(get_my_products))
            .route("/{id}", web::get().to(get_product_by_id))
            .route("/{id}", web::put().to(update_product))
            .route("/{id}", web::delete().to(delete_product)),
    );
}
