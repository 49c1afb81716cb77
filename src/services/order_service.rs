use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::config::CancellationPolicy;
use crate::entities::{
    order_entity as orders, order_item_entity as order_items, product_entity as products,
    user_entity as users, OrderStatus,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::CurrentUser;
use crate::models::*;

#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
    cancellation_policy: CancellationPolicy,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection, cancellation_policy: CancellationPolicy) -> Self {
        Self {
            pool,
            cancellation_policy,
        }
    }

    /// Place an order: reserve stock for every line, snapshot unit prices,
    /// and persist the order with its items, all inside one transaction.
    /// Any failure rolls the whole attempt back.
    pub async fn place_order(
        &self,
        user_id: i64,
        request: CreateOrderRequest,
    ) -> AppResult<OrderResponse> {
        if request.products.is_empty() {
            return Err(AppError::ValidationError(
                "Order must contain at least one product".to_string(),
            ));
        }
        if request.shipping_address.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Shipping address is required".to_string(),
            ));
        }
        for item in &request.products {
            if item.quantity < 1 {
                return Err(AppError::ValidationError(
                    "Quantity must be at least 1".to_string(),
                ));
            }
        }

        let txn = self.pool.begin().await?;

        let mut total_amount: i64 = 0;
        let mut lines: Vec<(products::Model, i32)> = Vec::with_capacity(request.products.len());

        for item in &request.products {
            let product = products::Entity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Product with id {} not found", item.product_id))
                })?;

            // Conditional decrement: only succeeds while enough stock is
            // left, so concurrent orders cannot both reserve the same units
            // whatever the isolation level.
            let reserved = products::Entity::update_many()
                .col_expr(
                    products::Column::Stock,
                    Expr::col(products::Column::Stock).sub(item.quantity),
                )
                .col_expr(
                    products::Column::UpdatedAt,
                    Expr::value(Some(Utc::now())),
                )
                .filter(products::Column::Id.eq(item.product_id))
                .filter(products::Column::Stock.gte(item.quantity))
                .exec(&txn)
                .await?;

            if reserved.rows_affected == 0 {
                txn.rollback().await?;
                return Err(AppError::InsufficientStock(format!(
                    "Insufficient stock for product \"{}\". Available: {}",
                    product.name, product.stock
                )));
            }

            total_amount += product.price * item.quantity as i64;
            lines.push((product, item.quantity));
        }

        let now = Utc::now();
        let order = orders::ActiveModel {
            user_id: Set(user_id),
            total_amount: Set(total_amount),
            shipping_address: Set(Some(request.shipping_address.clone())),
            status: Set(OrderStatus::Pending),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for (product, quantity) in &lines {
            order_items::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(Some(product.id)),
                quantity: Set(*quantity),
                // Snapshot: later price changes must not alter this order.
                price: Set(product.price),
                created_at: Set(Some(now)),
                updated_at: Set(Some(now)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        self.build_order_response(&self.pool, order, false).await
    }

    /// Cancel an order and return each line's quantity to its product's
    /// stock, atomically. Lines whose product was deleted are skipped, the
    /// row is gone and the reversal has no target.
    pub async fn cancel_order(&self, caller: &CurrentUser, order_id: i64) -> AppResult<OrderResponse> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.user_id != caller.id && !caller.role.is_admin() {
            return Err(AppError::Forbidden(
                "You are not allowed to cancel this order".to_string(),
            ));
        }

        // Fast path for a friendly message; the conditional flip below is
        // what actually guards against a concurrent cancel or status change.
        if !self.cancellation_policy.allows(order.status) {
            return Err(AppError::ValidationError(format!(
                "Cannot cancel an order with status \"{}\"",
                order.status
            )));
        }

        let txn = self.pool.begin().await?;

        // Conditional flip: only succeeds while the order is still in a
        // cancellable status, so two racing cancels cannot both restock.
        let flipped = orders::Entity::update_many()
            .col_expr(
                orders::Column::Status,
                Expr::value(OrderStatus::Cancelled),
            )
            .col_expr(orders::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(orders::Column::Id.eq(order_id))
            .filter(
                orders::Column::Status
                    .is_in(self.cancellation_policy.cancellable_statuses().iter().copied()),
            )
            .exec(&txn)
            .await?;

        if flipped.rows_affected == 0 {
            txn.rollback().await?;
            let current = orders::Entity::find_by_id(order_id)
                .one(&self.pool)
                .await?
                .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
            return Err(AppError::ValidationError(format!(
                "Cannot cancel an order with status \"{}\"",
                current.status
            )));
        }

        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        for item in &items {
            if let Some(product_id) = item.product_id {
                // rows_affected is 0 when the product disappeared between
                // the SET NULL and now; nothing to restock then.
                products::Entity::update_many()
                    .col_expr(
                        products::Column::Stock,
                        Expr::col(products::Column::Stock).add(item.quantity),
                    )
                    .col_expr(
                        products::Column::UpdatedAt,
                        Expr::value(Some(Utc::now())),
                    )
                    .filter(products::Column::Id.eq(product_id))
                    .exec(&txn)
                    .await?;
            }
        }

        txn.commit().await?;

        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        self.build_order_response(&self.pool, order, false).await
    }

    /// Admin-only status mutation; no stock side effects.
    pub async fn update_status(
        &self,
        order_id: i64,
        request: UpdateOrderStatusRequest,
    ) -> AppResult<OrderResponse> {
        let status: OrderStatus = request
            .status
            .parse()
            .map_err(|_| AppError::ValidationError("Invalid order status".to_string()))?;

        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if !order.status.can_transition_to(status) {
            return Err(AppError::ValidationError(format!(
                "Order status \"{}\" is terminal and cannot change",
                order.status
            )));
        }

        let mut active = order.into_active_model();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&self.pool).await?;

        self.build_order_response(&self.pool, order, false).await
    }

    /// Caller's own orders, newest first.
    pub async fn get_my_orders(&self, user_id: i64) -> AppResult<Vec<OrderResponse>> {
        let order_models = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .all(&self.pool)
            .await?;

        let mut result = Vec::with_capacity(order_models.len());
        for order in order_models {
            result.push(self.build_order_response(&self.pool, order, false).await?);
        }
        Ok(result)
    }

    /// All orders with buyer info; admin only (enforced at the route).
    pub async fn get_all_orders(&self) -> AppResult<Vec<OrderResponse>> {
        let order_models = orders::Entity::find()
            .order_by_desc(orders::Column::CreatedAt)
            .all(&self.pool)
            .await?;

        let mut result = Vec::with_capacity(order_models.len());
        for order in order_models {
            result.push(self.build_order_response(&self.pool, order, true).await?);
        }
        Ok(result)
    }

    /// Order detail, visible to the owning buyer, an admin, or a producer
    /// with at least one product among the order's items.
    pub async fn get_order_by_id(
        &self,
        caller: &CurrentUser,
        order_id: i64,
    ) -> AppResult<OrderResponse> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.user_id != caller.id && !caller.role.is_admin() {
            let items = order_items::Entity::find()
                .filter(order_items::Column::OrderId.eq(order_id))
                .all(&self.pool)
                .await?;
            let product_ids: Vec<i64> = items.iter().filter_map(|i| i.product_id).collect();

            let owns_some = if product_ids.is_empty() {
                false
            } else {
                products::Entity::find()
                    .filter(products::Column::Id.is_in(product_ids))
                    .filter(products::Column::UserId.eq(caller.id))
                    .one(&self.pool)
                    .await?
                    .is_some()
            };

            if !owns_some {
                return Err(AppError::Forbidden(
                    "You are not allowed to view this order".to_string(),
                ));
            }
        }

        self.build_order_response(&self.pool, order, true).await
    }

    async fn build_order_response<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: orders::Model,
        with_buyer: bool,
    ) -> AppResult<OrderResponse> {
        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order.id))
            .all(conn)
            .await?;

        let product_ids: Vec<i64> = items.iter().filter_map(|i| i.product_id).collect();
        let product_names: HashMap<i64, String> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            products::Entity::find()
                .filter(products::Column::Id.is_in(product_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|p| (p.id, p.name))
                .collect()
        };

        let item_responses: Vec<OrderItemResponse> = items
            .iter()
            .map(|item| {
                let name = item
                    .product_id
                    .and_then(|id| product_names.get(&id))
                    .map(String::as_str);
                OrderItemResponse::from_item(item, name)
            })
            .collect();

        let buyer = if with_buyer {
            users::Entity::find_by_id(order.user_id)
                .one(conn)
                .await?
                .as_ref()
                .map(UserSummary::from)
        } else {
            None
        };

        Ok(OrderResponse::new(order, item_responses, buyer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::services::test_util::*;

    fn service(db: &DatabaseConnection) -> OrderService {
        OrderService::new(db.clone(), CancellationPolicy::default())
    }

    fn order_request(lines: &[(i64, i32)]) -> CreateOrderRequest {
        CreateOrderRequest {
            products: lines
                .iter()
                .map(|&(product_id, quantity)| OrderItemRequest {
                    product_id,
                    quantity,
                })
                .collect(),
            shipping_address: "Rua das Flores 123".to_string(),
        }
    }

    async fn stock_of(db: &DatabaseConnection, product_id: i64) -> i32 {
        products::Entity::find_by_id(product_id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[tokio::test]
    async fn place_order_decrements_stock_and_snapshots_price() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;
        let producer = seed_user(&db, "Producer", "producer@example.com", UserRole::User).await;
        let category = seed_category(&db, "Hortaliças").await;
        let product = seed_product(&db, producer.id, category.id, "Tomate", 500, 5).await;

        let order = service(&db)
            .place_order(buyer.id, order_request(&[(product.id, 3)]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 1500);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price, 500);
        assert_eq!(order.items[0].subtotal, 1500);
        assert_eq!(stock_of(&db, product.id).await, 2);

        // total always equals the sum of line subtotals
        let line_sum: i64 = order.items.iter().map(|i| i.subtotal).sum();
        assert_eq!(order.total_amount, line_sum);
    }

    #[tokio::test]
    async fn insufficient_stock_fails_whole_order_and_leaves_no_rows() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;
        let producer = seed_user(&db, "Producer", "producer@example.com", UserRole::User).await;
        let category = seed_category(&db, "Frutas").await;
        let plenty = seed_product(&db, producer.id, category.id, "Banana", 200, 50).await;
        let scarce = seed_product(&db, producer.id, category.id, "Manga", 300, 5).await;

        let err = service(&db)
            .place_order(buyer.id, order_request(&[(plenty.id, 2), (scarce.id, 10)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(_)));

        // rollback: neither product lost stock, no order rows persisted
        assert_eq!(stock_of(&db, plenty.id).await, 50);
        assert_eq!(stock_of(&db, scarce.id).await, 5);
        assert!(orders::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(order_items::Entity::find()
            .all(&db)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_product_fails_with_not_found() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;

        let err = service(&db)
            .place_order(buyer.id, order_request(&[(999, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_restores_stock_exactly_once() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;
        let producer = seed_user(&db, "Producer", "producer@example.com", UserRole::User).await;
        let category = seed_category(&db, "Laticínios").await;
        let product = seed_product(&db, producer.id, category.id, "Queijo", 1200, 5).await;

        let svc = service(&db);
        let caller = CurrentUser {
            id: buyer.id,
            role: UserRole::User,
        };

        let order = svc
            .place_order(buyer.id, order_request(&[(product.id, 3)]))
            .await
            .unwrap();
        assert_eq!(stock_of(&db, product.id).await, 2);

        let cancelled = svc.cancel_order(&caller, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&db, product.id).await, 5);

        // re-cancelling is a state error and must not double-restock
        let err = svc.cancel_order(&caller, order.id).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(stock_of(&db, product.id).await, 5);
    }

    #[tokio::test]
    async fn racing_cancels_restock_only_once() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;
        let producer = seed_user(&db, "Producer", "producer@example.com", UserRole::User).await;
        let category = seed_category(&db, "Ovos").await;
        let product = seed_product(&db, producer.id, category.id, "Ovos caipira", 1500, 5).await;

        let svc = service(&db);
        let caller = CurrentUser {
            id: buyer.id,
            role: UserRole::User,
        };
        let order = svc
            .place_order(buyer.id, order_request(&[(product.id, 3)]))
            .await
            .unwrap();

        // both callers may read a still-cancellable status; the store-side
        // conditional flip lets exactly one of them restock
        let (first, second) = tokio::join!(
            svc.cancel_order(&caller, order.id),
            svc.cancel_order(&caller, order.id)
        );
        assert!(first.is_ok() != second.is_ok());
        assert_eq!(stock_of(&db, product.id).await, 5);
    }

    #[tokio::test]
    async fn cancel_is_denied_to_strangers() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;
        let other = seed_user(&db, "Other", "other@example.com", UserRole::User).await;
        let producer = seed_user(&db, "Producer", "producer@example.com", UserRole::User).await;
        let category = seed_category(&db, "Doces").await;
        let product = seed_product(&db, producer.id, category.id, "Goiabada", 800, 4).await;

        let svc = service(&db);
        let order = svc
            .place_order(buyer.id, order_request(&[(product.id, 1)]))
            .await
            .unwrap();

        let stranger = CurrentUser {
            id: other.id,
            role: UserRole::User,
        };
        let err = svc.cancel_order(&stranger, order.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // admin may cancel on the buyer's behalf
        let admin = seed_user(&db, "Admin", "admin@example.com", UserRole::Admin).await;
        let admin_caller = CurrentUser {
            id: admin.id,
            role: UserRole::Admin,
        };
        assert!(svc.cancel_order(&admin_caller, order.id).await.is_ok());
    }

    #[tokio::test]
    async fn shipped_orders_are_not_cancellable_under_default_policy() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;
        let producer = seed_user(&db, "Producer", "producer@example.com", UserRole::User).await;
        let category = seed_category(&db, "Grãos").await;
        let product = seed_product(&db, producer.id, category.id, "Feijão", 900, 10).await;

        let svc = service(&db);
        let order = svc
            .place_order(buyer.id, order_request(&[(product.id, 2)]))
            .await
            .unwrap();
        svc.update_status(
            order.id,
            UpdateOrderStatusRequest {
                status: "shipped".to_string(),
            },
        )
        .await
        .unwrap();

        let caller = CurrentUser {
            id: buyer.id,
            role: UserRole::User,
        };
        let err = svc.cancel_order(&caller, order.id).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(stock_of(&db, product.id).await, 8);
    }

    #[tokio::test]
    async fn status_update_rejects_unknown_and_terminal_transitions() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;
        let producer = seed_user(&db, "Producer", "producer@example.com", UserRole::User).await;
        let category = seed_category(&db, "Padaria").await;
        let product = seed_product(&db, producer.id, category.id, "Pão", 100, 20).await;

        let svc = service(&db);
        let order = svc
            .place_order(buyer.id, order_request(&[(product.id, 1)]))
            .await
            .unwrap();

        let err = svc
            .update_status(
                order.id,
                UpdateOrderStatusRequest {
                    status: "refunded".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        svc.update_status(
            order.id,
            UpdateOrderStatusRequest {
                status: "delivered".to_string(),
            },
        )
        .await
        .unwrap();

        let err = svc
            .update_status(
                order.id,
                UpdateOrderStatusRequest {
                    status: "pending".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn order_detail_visibility() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;
        let producer = seed_user(&db, "Producer", "producer@example.com", UserRole::User).await;
        let outsider = seed_user(&db, "Outsider", "outsider@example.com", UserRole::User).await;
        let category = seed_category(&db, "Hortaliças").await;
        let product = seed_product(&db, producer.id, category.id, "Alface", 350, 10).await;

        let svc = service(&db);
        let order = svc
            .place_order(buyer.id, order_request(&[(product.id, 2)]))
            .await
            .unwrap();

        let as_buyer = CurrentUser {
            id: buyer.id,
            role: UserRole::User,
        };
        assert!(svc.get_order_by_id(&as_buyer, order.id).await.is_ok());

        // producer of a contained product may view the order
        let as_producer = CurrentUser {
            id: producer.id,
            role: UserRole::User,
        };
        assert!(svc.get_order_by_id(&as_producer, order.id).await.is_ok());

        let as_outsider = CurrentUser {
            id: outsider.id,
            role: UserRole::User,
        };
        let err = svc
            .get_order_by_id(&as_outsider, order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn deleted_product_renders_fallback_label_and_skips_restock() {
        let db = test_db().await;
        let buyer = seed_user(&db, "Buyer", "buyer@example.com", UserRole::User).await;
        let producer = seed_user(&db, "Producer", "producer@example.com", UserRole::User).await;
        let category = seed_category(&db, "Flores").await;
        let product = seed_product(&db, producer.id, category.id, "Girassol", 700, 6).await;

        let svc = service(&db);
        let order = svc
            .place_order(buyer.id, order_request(&[(product.id, 2)]))
            .await
            .unwrap();

        products::Entity::delete_by_id(product.id)
            .exec(&db)
            .await
            .unwrap();

        let caller = CurrentUser {
            id: buyer.id,
            role: UserRole::User,
        };
        let detail = svc.get_order_by_id(&caller, order.id).await.unwrap();
        assert_eq!(detail.items[0].product_name, DELETED_PRODUCT_LABEL);
        assert_eq!(detail.items[0].product_id, None);

        // reversal has no target; cancellation still succeeds
        let cancelled = svc.cancel_order(&caller, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
    }
}
