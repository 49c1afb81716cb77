use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{category_entity as categories, product_entity as products};
use crate::error::{AppError, AppResult};
use crate::models::*;

#[derive(Clone)]
pub struct CategoryService {
    pool: DatabaseConnection,
}

impl CategoryService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
    ) -> AppResult<CategoryResponse> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Category name is required".to_string(),
            ));
        }

        // Fast path for a friendly message; the unique index is what
        // actually guarantees no duplicate survives a race.
        let existing = categories::Entity::find()
            .filter(categories::Column::Name.eq(name.clone()))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!(
                "A category named \"{name}\" already exists"
            )));
        }

        let now = Utc::now();
        let category = categories::ActiveModel {
            name: Set(name),
            description: Set(request.description),
            icon: Set(request.icon),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|e| match e {
            sea_orm::DbErr::Exec(_) => {
                AppError::Conflict("A category with this name already exists".to_string())
            }
            other => AppError::DatabaseError(other),
        })?;

        Ok(category.into())
    }

    pub async fn get_all_categories(&self) -> AppResult<Vec<CategoryResponse>> {
        let models = categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(models.into_iter().map(CategoryResponse::from).collect())
    }

    pub async fn get_category_by_id(&self, id: i64) -> AppResult<CategoryResponse> {
        let category = categories::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
        Ok(category.into())
    }

    pub async fn update_category(
        &self,
        id: i64,
        request: UpdateCategoryRequest,
    ) -> AppResult<CategoryResponse> {
        let category = categories::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        if let Some(name) = &request.name {
            if name != &category.name {
                let duplicate = categories::Entity::find()
                    .filter(categories::Column::Name.eq(name.clone()))
                    .filter(categories::Column::Id.ne(id))
                    .one(&self.pool)
                    .await?;
                if duplicate.is_some() {
                    return Err(AppError::Conflict(format!(
                        "Another category named \"{name}\" already exists"
                    )));
                }
            }
        }

        let mut active = category.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(icon) = request.icon {
            active.icon = Set(Some(icon));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&self.pool).await?;
        Ok(updated.into())
    }

    pub async fn delete_category(&self, id: i64) -> AppResult<()> {
        let category = categories::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        // Deleting a category out from under its listings would orphan them.
        let in_use = products::Entity::find()
            .filter(products::Column::CategoryId.eq(id))
            .count(&self.pool)
            .await?;
        if in_use > 0 {
            return Err(AppError::Conflict(format!(
                "Category \"{}\" still has {in_use} product(s)",
                category.name
            )));
        }

        categories::Entity::delete_by_id(id).exec(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::services::test_util::*;

    #[tokio::test]
    async fn duplicate_category_name_is_rejected() {
        let db = test_db().await;
        let svc = CategoryService::new(db.clone());

        svc.create_category(CreateCategoryRequest {
            name: "Frutas".to_string(),
            description: None,
            icon: None,
        })
        .await
        .unwrap();

        let err = svc
            .create_category(CreateCategoryRequest {
                name: "Frutas".to_string(),
                description: Some("outra".to_string()),
                icon: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn rename_collision_is_rejected() {
        let db = test_db().await;
        let svc = CategoryService::new(db.clone());

        let fruits = svc
            .create_category(CreateCategoryRequest {
                name: "Frutas".to_string(),
                description: None,
                icon: None,
            })
            .await
            .unwrap();
        svc.create_category(CreateCategoryRequest {
            name: "Legumes".to_string(),
            description: None,
            icon: None,
        })
        .await
        .unwrap();

        let err = svc
            .update_category(
                fruits.id,
                UpdateCategoryRequest {
                    name: Some("Legumes".to_string()),
                    description: None,
                    icon: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_refused_while_products_reference_it() {
        let db = test_db().await;
        let svc = CategoryService::new(db.clone());
        let producer = seed_user(&db, "P", "p@example.com", UserRole::User).await;
        let category = seed_category(&db, "Grãos").await;
        seed_product(&db, producer.id, category.id, "Arroz", 400, 10).await;

        let err = svc.delete_category(category.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // still present
        assert!(svc.get_category_by_id(category.id).await.is_ok());
    }
}
