use crate::entities::category_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    #[schema(example = "Hortaliças")]
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<category_entity::Model> for CategoryResponse {
    fn from(m: category_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            icon: m.icon,
            created_at: m.created_at,
        }
    }
}

/// Embedded category summary on product responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
}

impl From<&category_entity::Model> for CategorySummary {
    fn from(m: &category_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
        }
    }
}
