use crate::entities::UserRole;
use crate::error::AppError;
use crate::utils::JwtService;
use actix_web::http::Method;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};

/// Caller identity resolved from the bearer token, injected into request
/// extensions for handlers and services.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: i64,
    pub role: UserRole,
}

struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    /// Public for GET only; their POST/PUT/PATCH/DELETE siblings need auth.
    read_only_prefixes: Vec<&'static str>,
    /// Authenticated even when a public prefix would otherwise match.
    excluded_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec!["/", "/swagger-ui", "/swagger-ui/", "/api-docs/openapi.json"],
            prefix_paths: vec!["/swagger-ui/", "/api-docs/", "/api/auth/"],
            read_only_prefixes: vec!["/api/products", "/api/categories", "/api/reviews"],
            excluded_paths: vec!["/api/products/my-products"],
        }
    }

    fn is_public(&self, method: &Method, path: &str) -> bool {
        if self
            .excluded_paths
            .iter()
            .any(|&excluded| path.starts_with(excluded))
        {
            return false;
        }

        if self.exact_paths.contains(&path) {
            return true;
        }

        if self
            .prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
        {
            return true;
        }

        method == Method::GET
            && self
                .read_only_prefixes
                .iter()
                .any(|&prefix| path.starts_with(prefix))
    }
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // CORS preflights pass through
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        if self.public_paths.is_public(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let auth_header = req.headers().get("Authorization");

        let token = if let Some(auth_value) = auth_header {
            if let Ok(auth_str) = auth_value.to_str() {
                auth_str.strip_prefix("Bearer ")
            } else {
                None
            }
        } else {
            None
        };

        if let Some(token) = token {
            match self.jwt_service.verify_access_token(token) {
                Ok(claims) => match claims.sub.parse::<i64>() {
                    Ok(user_id) => {
                        req.extensions_mut().insert(CurrentUser {
                            id: user_id,
                            role: claims.role,
                        });
                        let fut = self.service.call(req);
                        Box::pin(fut)
                    }
                    Err(_) => {
                        // a subject we did not mint; never synthesize an id
                        let error = AppError::AuthError("Invalid access token".to_string());
                        Box::pin(async move { Err(error.into()) })
                    }
                },
                Err(_) => {
                    let error = AppError::AuthError("Invalid access token".to_string());
                    Box::pin(async move { Err(error.into()) })
                }
            }
        } else {
            let error = AppError::AuthError("Missing access token".to_string());
            Box::pin(async move { Err(error.into()) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Claims;
    use actix_web::{web, App, HttpResponse};
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[test]
    fn catalog_reads_are_public_but_writes_are_not() {
        let paths = PublicPaths::new();
        assert!(paths.is_public(&Method::GET, "/api/products"));
        assert!(paths.is_public(&Method::GET, "/api/products/3"));
        assert!(paths.is_public(&Method::GET, "/api/categories"));
        assert!(!paths.is_public(&Method::POST, "/api/products"));
        assert!(!paths.is_public(&Method::PUT, "/api/categories/2"));
    }

    #[test]
    fn orders_and_own_listings_always_need_auth() {
        let paths = PublicPaths::new();
        assert!(!paths.is_public(&Method::GET, "/api/orders"));
        assert!(!paths.is_public(&Method::GET, "/api/products/my-products"));
    }

    #[actix_web::test]
    async fn non_numeric_token_subject_is_rejected() {
        let jwt = JwtService::new("test-secret", 3600, 86400);
        let app = actix_web::test::init_service(
            App::new().wrap(AuthMiddleware::new(jwt)).route(
                "/api/users/me",
                web::get().to(|| async { HttpResponse::Ok().finish() }),
            ),
        )
        .await;

        // well-signed token whose subject is not an id we ever mint
        let claims = Claims {
            sub: "not-a-number".to_string(),
            role: UserRole::User,
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
            token_type: "access".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let req = actix_web::test::TestRequest::get()
            .uri("/api/users/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        assert!(actix_web::test::try_call_service(&app, req).await.is_err());
    }

    #[test]
    fn auth_routes_are_public() {
        let paths = PublicPaths::new();
        assert!(paths.is_public(&Method::POST, "/api/auth/login"));
        assert!(paths.is_public(&Method::POST, "/api/auth/register"));
        // refresh carries its own token in the body; an expired access
        // token must not block it
        assert!(paths.is_public(&Method::POST, "/api/auth/refresh"));
    }
}
