use crate::entities::product_entity;
use crate::models::{CategorySummary, UserSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    #[schema(example = "Tomate orgânico")]
    pub name: String,
    pub description: Option<String>,
    /// Unit price in cents.
    #[schema(example = 650)]
    pub price: i64,
    #[schema(example = 40)]
    pub stock: i32,
    pub category_id: i64,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub category_id: Option<i64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductQuery {
    /// Substring match on the product name.
    pub name: Option<String>,
    pub category_id: Option<i64>,
    /// Price bounds in cents.
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub image_url: Option<String>,
    pub user_id: i64,
    pub category_id: i64,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategorySummary>,
}

impl From<product_entity::Model> for ProductResponse {
    fn from(m: product_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            price: m.price,
            stock: m.stock,
            image_url: m.image_url,
            user_id: m.user_id,
            category_id: m.category_id,
            created_at: m.created_at,
            producer: None,
            category: None,
        }
    }
}

impl ProductResponse {
    pub fn with_relations(
        mut self,
        producer: Option<UserSummary>,
        category: Option<CategorySummary>,
    ) -> Self {
        self.producer = producer;
        self.category = category;
        self
    }
}

/// Embedded product summary on review and order-item responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub image_url: Option<String>,
}

impl From<&product_entity::Model> for ProductSummary {
    fn from(m: &product_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            price: m.price,
            image_url: m.image_url.clone(),
        }
    }
}
