use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{
    category_entity as categories, product_entity as products, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::CurrentUser;
use crate::models::*;

#[derive(Clone)]
pub struct ProductService {
    pool: DatabaseConnection,
}

impl ProductService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_product(
        &self,
        user_id: i64,
        request: CreateProductRequest,
    ) -> AppResult<ProductResponse> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Product name is required".to_string(),
            ));
        }
        if request.price < 0 {
            return Err(AppError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }
        if request.stock < 0 {
            return Err(AppError::ValidationError(
                "Stock cannot be negative".to_string(),
            ));
        }

        let category = categories::Entity::find_by_id(request.category_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        let now = Utc::now();
        let product = products::ActiveModel {
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            price: Set(request.price),
            stock: Set(request.stock),
            image_url: Set(request.image_url),
            user_id: Set(user_id),
            category_id: Set(category.id),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(product.into())
    }

    pub async fn get_all_products(
        &self,
        query: &ProductQuery,
    ) -> AppResult<PaginatedResponse<ProductResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut finder = products::Entity::find();
        if let Some(name) = &query.name {
            finder = finder.filter(products::Column::Name.contains(name));
        }
        if let Some(category_id) = query.category_id {
            finder = finder.filter(products::Column::CategoryId.eq(category_id));
        }
        if let Some(min_price) = query.min_price {
            finder = finder.filter(products::Column::Price.gte(min_price));
        }
        if let Some(max_price) = query.max_price {
            finder = finder.filter(products::Column::Price.lte(max_price));
        }

        let total = finder.clone().count(&self.pool).await? as i64;

        let models = finder
            .order_by_desc(products::Column::CreatedAt)
            .offset(params.get_offset())
            .limit(params.get_limit())
            .all(&self.pool)
            .await?;

        let items = self.attach_relations(models).await?;
        Ok(PaginatedResponse::new(items, &params, total))
    }

    /// The caller's own listings, newest first.
    pub async fn get_my_products(&self, user_id: i64) -> AppResult<Vec<ProductResponse>> {
        let models = products::Entity::find()
            .filter(products::Column::UserId.eq(user_id))
            .order_by_desc(products::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        self.attach_relations(models).await
    }

    pub async fn get_product_by_id(&self, id: i64) -> AppResult<ProductResponse> {
        let product = products::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        let mut responses = self.attach_relations(vec![product]).await?;
        Ok(responses.remove(0))
    }

    pub async fn update_product(
        &self,
        caller: &CurrentUser,
        id: i64,
        request: UpdateProductRequest,
    ) -> AppResult<ProductResponse> {
        let product = products::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        if product.user_id != caller.id && !caller.role.is_admin() {
            return Err(AppError::Forbidden(
                "You are not allowed to update this product".to_string(),
            ));
        }

        if let Some(price) = request.price {
            if price < 0 {
                return Err(AppError::ValidationError(
                    "Price cannot be negative".to_string(),
                ));
            }
        }
        if let Some(stock) = request.stock {
            if stock < 0 {
                return Err(AppError::ValidationError(
                    "Stock cannot be negative".to_string(),
                ));
            }
        }
        if let Some(category_id) = request.category_id {
            if category_id != product.category_id {
                categories::Entity::find_by_id(category_id)
                    .one(&self.pool)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
            }
        }

        let mut active = product.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(stock) = request.stock {
            active.stock = Set(stock);
        }
        if let Some(category_id) = request.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(image_url) = request.image_url {
            // The previous image file, if any, is orphaned here; cleanup is
            // the upload pipeline's job, not the API's.
            active.image_url = Set(Some(image_url));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&self.pool).await?;
        let mut responses = self.attach_relations(vec![updated]).await?;
        Ok(responses.remove(0))
    }

    pub async fn delete_product(&self, caller: &CurrentUser, id: i64) -> AppResult<()> {
        let product = products::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        if product.user_id != caller.id && !caller.role.is_admin() {
            return Err(AppError::Forbidden(
                "You are not allowed to delete this product".to_string(),
            ));
        }

        products::Entity::delete_by_id(id).exec(&self.pool).await?;
        Ok(())
    }

    /// Batch-load producer and category summaries for a page of products.
    async fn attach_relations(
        &self,
        models: Vec<products::Model>,
    ) -> AppResult<Vec<ProductResponse>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<i64> = models.iter().map(|p| p.user_id).collect();
        let category_ids: Vec<i64> = models.iter().map(|p| p.category_id).collect();

        let producers: HashMap<i64, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let cats: HashMap<i64, categories::Model> = categories::Entity::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(models
            .into_iter()
            .map(|p| {
                let producer = producers.get(&p.user_id).map(UserSummary::from);
                let category = cats.get(&p.category_id).map(CategorySummary::from);
                ProductResponse::from(p).with_relations(producer, category)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::services::test_util::*;

    #[tokio::test]
    async fn create_requires_existing_category() {
        let db = test_db().await;
        let svc = ProductService::new(db.clone());
        let producer = seed_user(&db, "P", "p@example.com", UserRole::User).await;

        let err = svc
            .create_product(
                producer.id,
                CreateProductRequest {
                    name: "Tomate".to_string(),
                    description: None,
                    price: 500,
                    stock: 10,
                    category_id: 42,
                    image_url: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_update() {
        let db = test_db().await;
        let svc = ProductService::new(db.clone());
        let producer = seed_user(&db, "P", "p@example.com", UserRole::User).await;
        let other = seed_user(&db, "O", "o@example.com", UserRole::User).await;
        let admin = seed_user(&db, "A", "a@example.com", UserRole::Admin).await;
        let category = seed_category(&db, "Frutas").await;
        let product = seed_product(&db, producer.id, category.id, "Uva", 900, 5).await;

        let update = |price| UpdateProductRequest {
            name: None,
            description: None,
            price: Some(price),
            stock: None,
            category_id: None,
            image_url: None,
        };

        let stranger = CurrentUser {
            id: other.id,
            role: UserRole::User,
        };
        let err = svc
            .update_product(&stranger, product.id, update(800))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let owner = CurrentUser {
            id: producer.id,
            role: UserRole::User,
        };
        let updated = svc
            .update_product(&owner, product.id, update(800))
            .await
            .unwrap();
        assert_eq!(updated.price, 800);

        let as_admin = CurrentUser {
            id: admin.id,
            role: UserRole::Admin,
        };
        let updated = svc
            .update_product(&as_admin, product.id, update(750))
            .await
            .unwrap();
        assert_eq!(updated.price, 750);
    }

    #[tokio::test]
    async fn listing_filters_by_category_and_price() {
        let db = test_db().await;
        let svc = ProductService::new(db.clone());
        let producer = seed_user(&db, "P", "p@example.com", UserRole::User).await;
        let fruits = seed_category(&db, "Frutas").await;
        let grains = seed_category(&db, "Grãos").await;
        seed_product(&db, producer.id, fruits.id, "Uva", 900, 5).await;
        seed_product(&db, producer.id, fruits.id, "Banana", 200, 8).await;
        seed_product(&db, producer.id, grains.id, "Arroz", 400, 20).await;

        let page = svc
            .get_all_products(&ProductQuery {
                name: None,
                category_id: Some(fruits.id),
                min_price: Some(300),
                max_price: None,
                page: None,
                per_page: None,
            })
            .await
            .unwrap();

        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].name, "Uva");
        assert_eq!(
            page.items[0].category.as_ref().map(|c| c.name.as_str()),
            Some("Frutas")
        );
    }
}
