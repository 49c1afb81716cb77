use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

use super::current_user;
use crate::models::*;
use crate::services::ReviewService;

#[utoipa::path(
    get,
    path = "/api/reviews",
    tag = "review",
    params(ReviewQuery),
    responses(
        (status = 200, description = "Reviews, optionally filtered by product")
    )
)]
pub async fn get_all_reviews(
    review_service: web::Data<ReviewService>,
    query: web::Query<ReviewQuery>,
) -> Result<HttpResponse> {
    match review_service.get_all_reviews(&query).await {
        Ok(reviews) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "results": reviews.len(),
            "data": { "reviews": reviews }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    tag = "review",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review detail", body = ReviewResponse),
        (status = 404, description = "Review not found")
    )
)]
pub async fn get_review_by_id(
    review_service: web::Data<ReviewService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match review_service.get_review_by_id(path.into_inner()).await {
        Ok(review) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "review": review }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    tag = "review",
    request_body = CreateReviewRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Review posted", body = ReviewResponse),
        (status = 400, description = "Invalid rating, empty text, or duplicate review"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn create_review(
    review_service: web::Data<ReviewService>,
    req: HttpRequest,
    request: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match review_service
        .create_review(caller.id, request.into_inner())
        .await
    {
        Ok(review) => Ok(HttpResponse::Created().json(json!({
            "status": "success",
            "data": { "review": review }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/api/reviews/{id}",
    tag = "review",
    params(("id" = i64, Path, description = "Review id")),
    request_body = UpdateReviewRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn update_review(
    review_service: web::Data<ReviewService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateReviewRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match review_service
        .update_review(&caller, path.into_inner(), request.into_inner())
        .await
    {
        Ok(review) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": { "review": review }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    tag = "review",
    params(("id" = i64, Path, description = "Review id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn delete_review(
    review_service: web::Data<ReviewService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(c) => c,
        Err(e) => return Ok(e.error_response()),
    };

    match review_service.delete_review(&caller, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn review_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reviews")
            .route("", web::get().to(get_all_reviews))
            .route("", web::post().to(create_review))
            .route("/{id}", web::get().to(get_review_by_id))
            .route("/{id}", web::patch().to(update_review))
            .route("/{id}", web::delete().to(delete_review)),
    );
}
