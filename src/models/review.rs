use crate::entities::review_entity;
use crate::models::{ProductSummary, UserSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub product_id: i64,
    #[schema(example = "Chegou fresco, recomendo.")]
    pub review: String,
    /// 1 to 5.
    #[schema(example = 5)]
    pub rating: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    pub review: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReviewQuery {
    pub product_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub review: String,
    pub rating: i32,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSummary>,
}

impl From<review_entity::Model> for ReviewResponse {
    fn from(m: review_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            product_id: m.product_id,
            review: m.review,
            rating: m.rating,
            created_at: m.created_at,
            user: None,
            product: None,
        }
    }
}

impl ReviewResponse {
    pub fn with_relations(
        mut self,
        user: Option<UserSummary>,
        product: Option<ProductSummary>,
    ) -> Self {
        self.user = user;
        self.product = product;
        self
    }
}
