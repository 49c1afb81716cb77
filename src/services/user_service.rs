use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{user_entity as users, UserRole};
use crate::error::{AppError, AppResult};
use crate::middlewares::CurrentUser;
use crate::models::*;

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn get_me(&self, user_id: i64) -> AppResult<UserResponse> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(user.into())
    }

    /// Self-service profile update; password changes are rejected here so
    /// they cannot sneak past the hashing path.
    pub async fn update_me(&self, user_id: i64, request: UpdateMeRequest) -> AppResult<UserResponse> {
        if request.password.is_some() {
            return Err(AppError::ValidationError(
                "This route is not for password updates".to_string(),
            ));
        }

        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if let Some(email) = &request.email {
            if email != &user.email {
                self.ensure_email_free(email, user.id).await?;
            }
        }

        let mut active = user.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(email) = request.email {
            active.email = Set(email);
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&self.pool).await?;
        Ok(updated.into())
    }

    pub async fn delete_me(&self, user_id: i64) -> AppResult<()> {
        let result = users::Entity::delete_by_id(user_id).exec(&self.pool).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    pub async fn get_all_users(&self) -> AppResult<Vec<UserResponse>> {
        let models = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(models.into_iter().map(UserResponse::from).collect())
    }

    pub async fn get_user_by_id(&self, id: i64) -> AppResult<UserResponse> {
        let user = users::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(user.into())
    }

    pub async fn update_user(
        &self,
        caller: &CurrentUser,
        id: i64,
        request: AdminUpdateUserRequest,
    ) -> AppResult<UserResponse> {
        if request.password.is_some() {
            return Err(AppError::ValidationError(
                "Admins cannot change a user's password through this route".to_string(),
            ));
        }

        let user = users::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        // An admin demoting themselves here would lock the door behind them.
        if caller.id == user.id {
            if let Some(role) = request.role {
                if !role.is_admin() {
                    return Err(AppError::Forbidden(
                        "Admins cannot demote their own role".to_string(),
                    ));
                }
            }
        }

        if let Some(email) = &request.email {
            if email != &user.email {
                self.ensure_email_free(email, user.id).await?;
            }
        }

        let mut active = user.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(email) = request.email {
            active.email = Set(email);
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&self.pool).await?;
        Ok(updated.into())
    }

    pub async fn delete_user(&self, caller: &CurrentUser, id: i64) -> AppResult<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if caller.id == user.id {
            return Err(AppError::Forbidden(
                "Admins cannot delete their own account through this route".to_string(),
            ));
        }

        users::Entity::delete_by_id(id).exec(&self.pool).await?;
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, except_user: i64) -> AppResult<()> {
        let taken = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::Id.ne(except_user))
            .one(&self.pool)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_util::*;

    #[tokio::test]
    async fn update_me_rejects_password_changes() {
        let db = test_db().await;
        let svc = UserService::new(db.clone());
        let user = seed_user(&db, "Ana", "ana@example.com", UserRole::User).await;

        let err = svc
            .update_me(
                user.id,
                UpdateMeRequest {
                    name: None,
                    email: None,
                    address: None,
                    phone: None,
                    password: Some("new-password".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn admin_cannot_demote_or_delete_self() {
        let db = test_db().await;
        let svc = UserService::new(db.clone());
        let admin = seed_user(&db, "Root", "root@example.com", UserRole::Admin).await;
        let caller = CurrentUser {
            id: admin.id,
            role: UserRole::Admin,
        };

        let err = svc
            .update_user(
                &caller,
                admin.id,
                AdminUpdateUserRequest {
                    name: None,
                    email: None,
                    role: Some(UserRole::User),
                    address: None,
                    phone: None,
                    password: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = svc.delete_user(&caller, admin.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn email_collision_is_rejected() {
        let db = test_db().await;
        let svc = UserService::new(db.clone());
        seed_user(&db, "Ana", "ana@example.com", UserRole::User).await;
        let bia = seed_user(&db, "Bia", "bia@example.com", UserRole::User).await;

        let err = svc
            .update_me(
                bia.id,
                UpdateMeRequest {
                    name: None,
                    email: Some("ana@example.com".to_string()),
                    address: None,
                    phone: None,
                    password: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
