use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // 4xx -> "fail", 5xx -> "error"; internal detail is logged, never
        // returned to the caller.
        let (status_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (actix_web::http::StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::InsufficientStock(msg) => {
                log::warn!("Insufficient stock: {msg}");
                (actix_web::http::StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::Conflict(msg) => {
                log::warn!("Conflict: {msg}");
                (actix_web::http::StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (actix_web::http::StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                )
            }
            AppError::Forbidden(msg) => {
                log::warn!("Forbidden: {msg}");
                (actix_web::http::StatusCode::FORBIDDEN, msg.clone())
            }
            AppError::NotFound(msg) => {
                (actix_web::http::StatusCode::NOT_FOUND, msg.clone())
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let status = if status_code.is_server_error() {
            "error"
        } else {
            "fail"
        };

        HttpResponse::build(status_code).json(json!({
            "status": status,
            "message": message
        }))
    }
}
