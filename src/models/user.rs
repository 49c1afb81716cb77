use crate::entities::{user_entity, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Full user representation. The password hash never leaves the service
/// layer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<user_entity::Model> for UserResponse {
    fn from(m: user_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            role: m.role,
            address: m.address,
            phone: m.phone,
            created_at: m.created_at,
        }
    }
}

/// Embedded author/producer/buyer summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<&user_entity::Model> for UserSummary {
    fn from(m: &user_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            email: m.email.clone(),
            phone: m.phone.clone(),
        }
    }
}

/// Self-service profile update; role and password changes go through
/// dedicated paths.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    // Present only to reject password changes on this route.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}
