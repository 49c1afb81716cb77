use crate::entities::{order_entity, order_item_entity, OrderStatus};
use crate::models::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Label shown for lines whose product was deleted after purchase.
pub const DELETED_PRODUCT_LABEL: &str = "Product no longer available";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: i64,
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub products: Vec<OrderItemRequest>,
    #[schema(example = "Rua das Flores 123, Centro")]
    pub shipping_address: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of pending/processing/shipped/delivered/cancelled.
    #[schema(example = "shipped")]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i64,
    pub product_id: Option<i64>,
    /// Falls back to a placeholder when the product no longer exists.
    pub product_name: String,
    pub quantity: i32,
    /// Unit price in cents at purchase time.
    pub price: i64,
    pub subtotal: i64,
}

impl OrderItemResponse {
    pub fn from_item(item: &order_item_entity::Model, product_name: Option<&str>) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: product_name
                .unwrap_or(DELETED_PRODUCT_LABEL)
                .to_string(),
            quantity: item.quantity,
            price: item.price,
            subtotal: item.price * item.quantity as i64,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    /// Cents.
    pub total_amount: i64,
    pub shipping_address: Option<String>,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer: Option<UserSummary>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    pub fn new(
        order: order_entity::Model,
        items: Vec<OrderItemResponse>,
        buyer: Option<UserSummary>,
    ) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address,
            status: order.status,
            created_at: order.created_at,
            buyer,
            items,
        }
    }
}
