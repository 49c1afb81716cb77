use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{
    product_entity as products, review_entity as reviews, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::CurrentUser;
use crate::models::*;

#[derive(Clone)]
pub struct ReviewService {
    pool: DatabaseConnection,
}

impl ReviewService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_review(
        &self,
        user_id: i64,
        request: CreateReviewRequest,
    ) -> AppResult<ReviewResponse> {
        if request.review.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Review text is required".to_string(),
            ));
        }
        if !(1..=5).contains(&request.rating) {
            return Err(AppError::ValidationError(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        products::Entity::find_by_id(request.product_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        // Friendly-error fast path; the unique (user_id, product_id) index
        // is the real guard against concurrent duplicates.
        let existing = reviews::Entity::find()
            .filter(reviews::Column::UserId.eq(user_id))
            .filter(reviews::Column::ProductId.eq(request.product_id))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "You have already reviewed this product".to_string(),
            ));
        }

        let now = Utc::now();
        let review = reviews::ActiveModel {
            user_id: Set(user_id),
            product_id: Set(request.product_id),
            review: Set(request.review),
            rating: Set(request.rating),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|e| match e {
            sea_orm::DbErr::Exec(_) => {
                AppError::Conflict("You have already reviewed this product".to_string())
            }
            other => AppError::DatabaseError(other),
        })?;

        Ok(review.into())
    }

    pub async fn get_all_reviews(&self, query: &ReviewQuery) -> AppResult<Vec<ReviewResponse>> {
        let mut finder = reviews::Entity::find();
        if let Some(product_id) = query.product_id {
            finder = finder.filter(reviews::Column::ProductId.eq(product_id));
        }

        let models = finder
            .order_by_desc(reviews::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        self.attach_relations(models).await
    }

    pub async fn get_review_by_id(&self, id: i64) -> AppResult<ReviewResponse> {
        let review = reviews::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        let mut responses = self.attach_relations(vec![review]).await?;
        Ok(responses.remove(0))
    }

    pub async fn update_review(
        &self,
        caller: &CurrentUser,
        id: i64,
        request: UpdateReviewRequest,
    ) -> AppResult<ReviewResponse> {
        let review = reviews::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        if review.user_id != caller.id && !caller.role.is_admin() {
            return Err(AppError::Forbidden(
                "You are not allowed to update this review".to_string(),
            ));
        }

        if let Some(rating) = request.rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::ValidationError(
                    "Rating must be between 1 and 5".to_string(),
                ));
            }
        }

        let mut active = review.into_active_model();
        if let Some(text) = request.review {
            active.review = Set(text);
        }
        if let Some(rating) = request.rating {
            active.rating = Set(rating);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&self.pool).await?;
        Ok(updated.into())
    }

    pub async fn delete_review(&self, caller: &CurrentUser, id: i64) -> AppResult<()> {
        let review = reviews::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        if review.user_id != caller.id && !caller.role.is_admin() {
            return Err(AppError::Forbidden(
                "You are not allowed to delete this review".to_string(),
            ));
        }

        reviews::Entity::delete_by_id(id).exec(&self.pool).await?;
        Ok(())
    }

    async fn attach_relations(&self, models: Vec<reviews::Model>) -> AppResult<Vec<ReviewResponse>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<i64> = models.iter().map(|r| r.user_id).collect();
        let product_ids: Vec<i64> = models.iter().map(|r| r.product_id).collect();

        let authors: HashMap<i64, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let subjects: HashMap<i64, products::Model> = products::Entity::find()
            .filter(products::Column::Id.is_in(product_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(models
            .into_iter()
            .map(|r| {
                let user = authors.get(&r.user_id).map(UserSummary::from);
                let product = subjects.get(&r.product_id).map(ProductSummary::from);
                ReviewResponse::from(r).with_relations(user, product)
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
    async fn duplicate_review_is_rejected_and_original_untouched() {
        let db = test_db().await;
        let svc = ReviewService::new(db.clone());
        let author = seed_user(&db, "Ana", "ana@example.com", UserRole::User).await;
        let producer = seed_user(&db, "P", "p@example.com", UserRole::User).await;
        let category = seed_category(&db, "Frutas").await;
        let product = seed_product(&db, producer.id, category.id, "Manga", 300, 10).await;

        let first = svc
            .create_review(
                author.id,
                CreateReviewRequest {
                    product_id: product.id,
                    review: "Excelente".to_string(),
                    rating: 5,
                },
            )
            .await
            .unwrap();

        let err = svc
            .create_review(
                author.id,
                CreateReviewRequest {
                    product_id: product.id,
                    review: "Mudei de ideia".to_string(),
                    rating: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let kept = svc.get_review_by_id(first.id).await.unwrap();
        assert_eq!(kept.review, "Excelente");
        assert_eq!(kept.rating, 5);
    }

    #[tokio::test]
    async fn rating_bounds_are_enforced() {
        let db = test_db().await;
        let svc = ReviewService::new(db.clone());
        let author = seed_user(&db, "Ana", "ana@example.com", UserRole::User).await;
        let producer = seed_user(&db, "P", "p@example.com", UserRole::User).await;
        let category = seed_category(&db, "Frutas").await;
        let product = seed_product(&db, producer.id, category.id, "Manga", 300, 10).await;

        for rating in [0, 6] {
            let err = svc
                .create_review(
                    author.id,
                    CreateReviewRequest {
                        product_id: product.id,
                        review: "ok".to_string(),
                        rating,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
    }

    #[tokio::test]
    async fn only_author_or_admin_may_delete() {
        let db = test_db().await;
        let svc = ReviewService::new(db.clone());
        let author = seed_user(&db, "Ana", "ana@example.com", UserRole::User).await;
        let other = seed_user(&db, "Bia", "bia@example.com", UserRole::User).await;
        let producer = seed_user(&db, "P", "p@example.com", UserRole::User).await;
        let category = seed_category(&db, "Frutas").await;
        let product = seed_product(&db, producer.id, category.id, "Manga", 300, 10).await;

        let review = svc
            .create_review(
                author.id,
                CreateReviewRequest {
                    product_id: product.id,
                    review: "Bom".to_string(),
                    rating: 4,
                },
            )
            .await
            .unwrap();

        let stranger = CurrentUser {
            id: other.id,
            role: UserRole::User,
        };
        let err = svc.delete_review(&stranger, review.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let as_author = CurrentUser {
            id: author.id,
            role: UserRole::User,
        };
        svc.delete_review(&as_author, review.id).await.unwrap();
        assert!(svc.get_review_by_id(review.id).await.is_err());
    }
}
