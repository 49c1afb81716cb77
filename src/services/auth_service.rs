use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{user_entity as users, UserRole};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{hash_password, validate_password, verify_password, JwtService};

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(pool: DatabaseConnection, jwt_service: JwtService) -> Self {
        Self { pool, jwt_service }
    }

    /// Registration always creates a regular user; admins are promoted by an
    /// existing admin through the user management routes.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }
        if !request.email.contains('@') {
            return Err(AppError::ValidationError(
                "A valid email is required".to_string(),
            ));
        }
        validate_password(&request.password)?;

        let existing = users::Entity::find()
            .filter(users::Column::Email.eq(request.email.clone()))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();
        let user = users::ActiveModel {
            name: Set(request.name.trim().to_string()),
            email: Set(request.email),
            password_hash: Set(password_hash),
            role: Set(UserRole::User),
            address: Set(request.address),
            phone: Set(request.phone),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|e| match e {
            sea_orm::DbErr::Exec(_) => {
                AppError::Conflict("A user with this email already exists".to_string())
            }
            other => AppError::DatabaseError(other),
        })?;

        log::info!("New user registered: {} (id {})", user.email, user.id);
        self.issue_tokens(user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(request.email.clone()))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::AuthError(
                "Invalid email or password".to_string(),
            ));
        }

        self.issue_tokens(user)
    }

    /// Exchange a refresh token for a fresh pair. The user is reloaded so a
    /// role change or deletion takes effect immediately.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))?;

        self.issue_tokens(user)
    }

    fn issue_tokens(&self, user: users::Model) -> AppResult<AuthResponse> {
        let access_token = self.jwt_service.generate_access_token(user.id, user.role)?;
        let refresh_token = self.jwt_service.generate_refresh_token(user.id, user.role)?;

        Ok(AuthResponse {
            user: user.into(),
            access_token,
            refresh_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_util::*;

    fn service(db: &DatabaseConnection) -> AuthService {
        AuthService::new(db.clone(), JwtService::new("test-secret", 3600, 86400))
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Maria".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
            address: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let db = test_db().await;
        let svc = service(&db);

        let registered = svc.register(register_request("maria@example.com")).await.unwrap();
        assert_eq!(registered.user.role, UserRole::User);

        let logged_in = svc
            .login(LoginRequest {
                email: "maria@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let err = svc
            .login(LoginRequest {
                email: "maria@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = test_db().await;
        let svc = service(&db);

        svc.register(register_request("maria@example.com")).await.unwrap();
        let err = svc
            .register(register_request("maria@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens() {
        let db = test_db().await;
        let svc = service(&db);

        let auth = svc.register(register_request("maria@example.com")).await.unwrap();
        assert!(svc.refresh(&auth.refresh_token).await.is_ok());
        assert!(svc.refresh(&auth.access_token).await.is_err());
    }
}
