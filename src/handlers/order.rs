use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

use super::{current_user, require_admin};
use crate::models::*;
use crate::services::OrderService;

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "order",
    request_body = CreateOrderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Order placed"),
        (status = 400, description = "Invalid payload or insufficient stock"),
        (status = 404, description = "Referenced product not found")
    )
)]
pub async fn create_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    request: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service
        .place_order(caller.id, request.into_inner())
        .await
    {
        Ok(order) => Ok(HttpResponse::Created().json(json!({
            "status": "success",
            "data": { "order": order }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/orders/my-orders",
    tag = "order",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's orders"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_my_orders(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service.get_my_orders(caller.id).await {
        Ok(orders) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "results": orders.len(),
            "data": { "orders": orders }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "order",
    params(("id" = i64, Path, description = "Order id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Order detail"),
        (status = 403, description = "Not the buyer, an involved producer, or an admin"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn get_order_by_id(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service
        .get_order_by_id(&caller, path.into_inner())
        .await
    {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "order": order }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "order",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All orders"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn get_all_orders(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };
    if let Err(e) = require_admin(&caller) {
        return Ok(e.error_response());
    }

    match order_service.get_all_orders().await {
        Ok(orders) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "results": orders.len(),
            "data": { "orders": orders }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/cancel",
    tag = "order",
    params(("id" = i64, Path, description = "Order id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Order cancelled, stock restored"),
        (status = 400, description = "Order is not in a cancellable status"),
        (status = 403, description = "Not the buyer or an admin")
    )
)]
pub async fn cancel_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service.cancel_order(&caller, path.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "message": "Order cancelled and stock restored",
            "data": { "order": order }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    tag = "order",
    params(("id" = i64, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Unknown status or terminal transition"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn update_order_status(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };
    if let Err(e) = require_admin(&caller) {
        return Ok(e.error_response());
    }

    match order_service
        .update_status(path.into_inner(), request.into_inner())
        .await
    {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "order": order }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(create_order))
            .route("", web::get().to(get_all_orders))
            .route("/my-orders", web::get().to(get_my_orders))
            .route("/{id}", web::get().to(get_order_by_id))
            .route("/{id}/cancel", web::patch().to(cancel_order))
            .route("/{id}/status", web::patch().to(update_order_status)),
    );
}
