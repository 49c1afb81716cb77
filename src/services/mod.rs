pub mod auth_service;
pub mod category_service;
pub mod order_service;
pub mod product_service;
pub mod review_service;
pub mod user_service;

pub use auth_service::*;
pub use category_service::*;
pub use order_service::*;
pub use product_service::*;
pub use review_service::*;
pub use user_service::*;

#[cfg(test)]
pub(crate) mod test_util {
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

    use crate::entities::{
        category_entity as categories, product_entity as products, user_entity as users, UserRole,
    };

    /// Fresh in-memory SQLite database with the real migrations applied.
    /// Capped at one connection so every query sees the same memory.
    pub async fn test_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    pub async fn seed_user(
        db: &DatabaseConnection,
        name: &str,
        email: &str,
        role: UserRole,
    ) -> users::Model {
        users::ActiveModel {
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            // not a real hash; auth tests go through AuthService::register
            password_hash: Set("x".to_string()),
            role: Set(role),
            address: Set(None),
            phone: Set(None),
            created_at: Set(Some(Utc::now())),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn seed_category(db: &DatabaseConnection, name: &str) -> categories::Model {
        categories::ActiveModel {
            name: Set(name.to_string()),
            description: Set(None),
            icon: Set(None),
            created_at: Set(Some(Utc::now())),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn seed_product(
        db: &DatabaseConnection,
        user_id: i64,
        category_id: i64,
        name: &str,
        price: i64,
        stock: i32,
    ) -> products::Model {
        products::ActiveModel {
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            stock: Set(stock),
            image_url: Set(None),
            user_id: Set(user_id),
            category_id: Set(category_id),
            created_at: Set(Some(Utc::now())),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }
}
