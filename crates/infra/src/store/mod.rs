//! Transactional storage abstraction.
//!
//! Every service operation runs inside one [`UnitOfWork`]. Writes become
//! visible to other units only after [`UnitOfWork::commit`]; dropping a unit
//! without committing discards everything it wrote. `lock_*` reads take a row
//! lock that is held until the unit ends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use shopfront_auth::User;
use shopfront_catalog::{Category, Product, ProductFilter, ProductSort, Review};
use shopfront_core::{CategoryId, OrderId, Page, PageRequest, ProductId, ReviewId, UserId};
use shopfront_inventory::Reservation;
use shopfront_sales::{Cart, Order, OrderStatus, Payment, Wishlist};

use crate::views::{CategorySales, DailyStats, TopProduct};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error in {operation}: {message}")]
    Database { operation: &'static str, message: String },

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("stored data could not be decoded: {0}")]
    Serialization(String),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point: opens units of work.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// One transaction over the whole data set.
#[async_trait]
pub trait UnitOfWork: Send {
    // users
    async fn get_user(&mut self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    async fn save_user(&mut self, user: &User) -> StoreResult<()>;
    async fn count_users(&mut self) -> StoreResult<u64>;
    /// Newest first.
    async fn list_users(&mut self, page: PageRequest) -> StoreResult<Page<User>>;
    /// Removes the user with their cart, wishlist and reviews. Orders are
    /// never deleted, so callers must check [`UnitOfWork::user_has_orders`].
    async fn delete_user(&mut self, id: UserId) -> StoreResult<()>;
    async fn user_has_orders(&mut self, id: UserId) -> StoreResult<bool>;

    // categories
    async fn get_category(&mut self, id: CategoryId) -> StoreResult<Option<Category>>;
    async fn find_category_by_name(&mut self, name: &str) -> StoreResult<Option<Category>>;
    async fn list_categories(&mut self) -> StoreResult<Vec<Category>>;
    async fn save_category(&mut self, category: &Category) -> StoreResult<()>;
    async fn delete_category(&mut self, id: CategoryId) -> StoreResult<()>;
    async fn count_products_in_category(&mut self, id: CategoryId) -> StoreResult<u64>;

    // products
    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;
    /// Read a product and hold its row lock until the unit ends.
    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn save_product(&mut self, product: &Product) -> StoreResult<()>;
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()>;
    async fn search_products(
        &mut self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> StoreResult<Page<Product>>;
    async fn count_products(&mut self) -> StoreResult<u64>;
    async fn product_has_orders(&mut self, id: ProductId) -> StoreResult<bool>;

    // carts and wishlists
    async fn get_cart(&mut self, user_id: UserId) -> StoreResult<Option<Cart>>;
    /// Read a cart and hold its line locks until the unit ends. A unit that
    /// waited on the lock sees the lines as the holder committed them.
    async fn lock_cart(&mut self, user_id: UserId) -> StoreResult<Option<Cart>>;
    async fn save_cart(&mut self, cart: &Cart) -> StoreResult<()>;
    async fn get_wishlist(&mut self, user_id: UserId) -> StoreResult<Option<Wishlist>>;
    async fn save_wishlist(&mut self, wishlist: &Wishlist) -> StoreResult<()>;

    // orders
    async fn get_order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;
    /// Read an order and hold its row lock until the unit ends.
    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;
    /// Insert or update. Items are written on first insert only.
    async fn save_order(&mut self, order: &Order) -> StoreResult<()>;
    /// Newest first. `None` lists every user's orders.
    async fn list_orders(&mut self, user_id: Option<UserId>, page: PageRequest) -> StoreResult<Page<Order>>;
    async fn count_orders_since(&mut self, since: Option<DateTime<Utc>>) -> StoreResult<u64>;
    /// Sum of totals of orders whose payment completed.
    async fn revenue_since(&mut self, since: Option<DateTime<Utc>>) -> StoreResult<Decimal>;
    async fn count_orders_with_status(&mut self, status: OrderStatus) -> StoreResult<u64>;
    /// Per UTC day, oldest first.
    async fn daily_order_stats(&mut self, since: DateTime<Utc>) -> StoreResult<Vec<DailyStats>>;
    /// Lines of orders placed since `since`, grouped by the product's current
    /// category. Uncategorized products are left out.
    async fn sales_by_category(&mut self, since: DateTime<Utc>) -> StoreResult<Vec<CategorySales>>;
    /// Best sellers by units ordered, ties broken by name.
    async fn top_products(&mut self, since: DateTime<Utc>, limit: u32) -> StoreResult<Vec<TopProduct>>;

    // reservations
    async fn reservations_for_order(&mut self, order_id: OrderId) -> StoreResult<Vec<Reservation>>;
    async fn save_reservation(&mut self, reservation: &Reservation) -> StoreResult<()>;

    // payments
    async fn get_payment_by_intent(&mut self, intent_id: &str) -> StoreResult<Option<Payment>>;
    async fn get_payment_for_order(&mut self, order_id: OrderId) -> StoreResult<Option<Payment>>;
    /// One payment per order: saving replaces the order's previous payment.
    async fn save_payment(&mut self, payment: &Payment) -> StoreResult<()>;

    // reviews
    async fn get_review(&mut self, id: ReviewId) -> StoreResult<Option<Review>>;
    async fn find_review(&mut self, user_id: UserId, product_id: ProductId) -> StoreResult<Option<Review>>;
    async fn save_review(&mut self, review: &Review) -> StoreResult<()>;
    async fn delete_review(&mut self, id: ReviewId) -> StoreResult<()>;
    async fn list_reviews(&mut self, product_id: ProductId, page: PageRequest) -> StoreResult<Page<Review>>;
    async fn ratings_for_product(&mut self, product_id: ProductId) -> StoreResult<Vec<u8>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
