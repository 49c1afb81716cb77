pub mod categories;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

pub use categories as category_entity;
pub use order_items as order_item_entity;
pub use orders as order_entity;
pub use products as product_entity;
pub use reviews as review_entity;
pub use users as user_entity;

pub use orders::OrderStatus;
pub use users::UserRole;
