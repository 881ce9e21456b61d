//! Postgres-backed store.
//!
//! Each unit of work is one database transaction. Product, order and cart rows
//! read through `lock_*` are taken with `SELECT ... FOR UPDATE`, so concurrent
//! reservations against the same product serialize on the row lock. Dropping
//! an uncommitted [`PostgresUnit`] rolls the transaction back.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any other | `Database` |
//! | ColumnDecode / type mismatch | N/A | `Serialization` |
//! | PoolClosed, Io, other | N/A | `Database` |

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use shopfront_auth::{Role, User};
use shopfront_catalog::{Category, Product, ProductFilter, ProductSort, Review};
use shopfront_core::{CategoryId, OrderId, Page, PageRequest, ProductId, ReviewId, UserId};
use shopfront_inventory::Reservation;
use shopfront_sales::{Cart, Order, OrderItem, OrderStatus, Payment, Wishlist};

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::views::{CategorySales, DailyStats, TopProduct};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.original_price, \
     p.stock_count, p.featured, p.is_new, p.image, p.tags, p.category_id, p.created_at";

const USER_COLUMNS: &str =
    "id, email, display_name, phone, address, avatar, role, enabled, created_at";

const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, payment_status, \
     shipping_address, payment_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables that do not exist yet.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresUnit { tx }))
    }
}

pub struct PostgresUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnit {
    async fn get_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, display_name, phone, address, avatar, role, enabled, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                display_name = EXCLUDED.display_name,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                avatar = EXCLUDED.avatar,
                role = EXCLUDED.role,
                enabled = EXCLUDED.enabled
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.avatar)
        .bind(user.role.as_str())
        .bind(user.enabled)
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_user", e))?;
        Ok(())
    }

    async fn count_users(&mut self) -> StoreResult<u64> {
        self.count("count_users", "SELECT COUNT(*) AS total FROM users").await
    }

    async fn list_users(&mut self, page: PageRequest) -> StoreResult<Page<User>> {
        let total = self.count("count_users", "SELECT COUNT(*) AS total FROM users").await?;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.size))
            .bind(page.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        let users = rows.iter().map(user_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(users, page, total))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user(&mut self, id: UserId) -> StoreResult<()> {
        for (operation, sql) in [
            ("delete_user_cart", "DELETE FROM cart_items WHERE user_id = $1"),
            ("delete_user_wishlist", "DELETE FROM wishlist_items WHERE user_id = $1"),
            ("delete_user_reviews", "DELETE FROM reviews WHERE user_id = $1"),
            ("delete_user", "DELETE FROM users WHERE id = $1"),
        ] {
            sqlx::query(sql)
                .bind(id.as_uuid())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error(operation, e))?;
        }
        Ok(())
    }

    async fn user_has_orders(&mut self, id: UserId) -> StoreResult<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM orders WHERE user_id = $1) AS referenced")
            .bind(id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("user_has_orders", e))?;
        col(&row, "referenced")
    }

    async fn get_category(&mut self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name, description, image FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn find_category_by_name(&mut self, name: &str) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name, description, image FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_category_by_name", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list_categories(&mut self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, description, image FROM categories ORDER BY name")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(category_from_row).collect()
    }

    async fn save_category(&mut self, category: &Category) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, image)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                image = EXCLUDED.image
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_category", e))?;
        Ok(())
    }

    async fn delete_category(&mut self, id: CategoryId) -> StoreResult<()> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(())
    }

    async fn count_products_in_category(&mut self, id: CategoryId) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM products WHERE category_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_products_in_category", e))?;
        total_from_row(&row)
    }

    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price, original_price, stock_count, in_stock,
                featured, is_new, image, tags, category_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                original_price = EXCLUDED.original_price,
                stock_count = EXCLUDED.stock_count,
                in_stock = EXCLUDED.in_stock,
                featured = EXCLUDED.featured,
                is_new = EXCLUDED.is_new,
                image = EXCLUDED.image,
                tags = EXCLUDED.tags,
                category_id = EXCLUDED.category_id
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(to_i32(product.stock_count(), "stock_count")?)
        .bind(product.in_stock())
        .bind(product.featured)
        .bind(product.is_new)
        .bind(&product.image)
        .bind(&product.tags)
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .bind(product.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_product", e))?;
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(())
    }

    #[instrument(
        skip(self, filter),
        fields(page = page.page, size = page.size, sort = ?sort, result_count = tracing::field::Empty),
        err
    )]
    async fn search_products(
        &mut self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> StoreResult<Page<Product>> {
        let span = Span::current();

        let count_sql = format!("SELECT COUNT(*) AS total {PRODUCT_SEARCH}");
        let row = bind_filter(sqlx::query(&count_sql), filter)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_products_matching", e))?;
        let total = total_from_row(&row)?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_SEARCH} ORDER BY {} LIMIT $9 OFFSET $10",
            sort.order_by()
        );
        let rows = bind_filter(sqlx::query(&sql), filter)
            .bind(i64::from(page.size))
            .bind(page.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("search_products", e))?;

        let items = rows.iter().map(product_from_row).collect::<StoreResult<Vec<_>>>()?;
        span.record("result_count", items.len());
        Ok(Page::new(items, page, total))
    }

    async fn count_products(&mut self) -> StoreResult<u64> {
        self.count("count_products", "SELECT COUNT(*) AS total FROM products").await
    }

    async fn product_has_orders(&mut self, id: ProductId) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1) AS referenced",
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("product_has_orders", e))?;
        col(&row, "referenced")
    }

    async fn get_cart(&mut self, user_id: UserId) -> StoreResult<Option<Cart>> {
        self.load_cart(
            "SELECT product_id, quantity FROM cart_items WHERE user_id = $1",
            user_id,
            "get_cart",
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn lock_cart(&mut self, user_id: UserId) -> StoreResult<Option<Cart>> {
        // Row locks on the lines make a concurrent checkout of the same cart
        // wait here and then read the cart this unit emptied.
        self.load_cart(
            "SELECT product_id, quantity FROM cart_items WHERE user_id = $1 FOR UPDATE",
            user_id,
            "lock_cart",
        )
        .await
    }

    async fn save_cart(&mut self, cart: &Cart) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(cart.user_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;

        for (product_id, quantity) in cart.lines() {
            sqlx::query("INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3)")
                .bind(cart.user_id.as_uuid())
                .bind(product_id.as_uuid())
                .bind(to_i32(quantity, "quantity")?)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("insert_cart_item", e))?;
        }
        Ok(())
    }

    async fn get_wishlist(&mut self, user_id: UserId) -> StoreResult<Option<Wishlist>> {
        let rows = sqlx::query("SELECT product_id FROM wishlist_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_wishlist", e))?;

        let products = rows
            .iter()
            .map(|row| col::<Uuid>(row, "product_id").map(ProductId::from_uuid))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Some(Wishlist::restore(user_id, products)))
    }

    async fn save_wishlist(&mut self, wishlist: &Wishlist) -> StoreResult<()> {
        sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1")
            .bind(wishlist.user_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("clear_wishlist", e))?;

        for product_id in wishlist.products() {
            sqlx::query("INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2)")
                .bind(wishlist.user_id.as_uuid())
                .bind(product_id.as_uuid())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("insert_wishlist_item", e))?;
        }
        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        self.load_order(&sql, id, "get_order").await
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        self.load_order(&sql, id, "lock_order").await
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, status = %order.status()), err)]
    async fn save_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, total_amount, status, payment_status,
                shipping_address, payment_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                payment_status = EXCLUDED.payment_status,
                payment_id = EXCLUDED.payment_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.total_amount())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(&order.shipping_address)
        .bind(&order.payment_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_order", e))?;

        for (line_no, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, line_no, product_id, product_name, product_image, quantity, price
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (order_id, line_no) DO NOTHING
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line_no as i32)
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(&item.product_image)
            .bind(to_i32(item.quantity, "quantity")?)
            .bind(item.price)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }
        Ok(())
    }

    async fn list_orders(&mut self, user_id: Option<UserId>, page: PageRequest) -> StoreResult<Page<Order>> {
        let user_param: Option<Uuid> = user_id.map(|u| *u.as_uuid());

        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM orders WHERE ($1::uuid IS NULL OR user_id = $1)",
        )
        .bind(user_param)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("count_orders", e))?;
        let total = total_from_row(&row)?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(user_param)
            .bind(i64::from(page.size))
            .bind(page.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| col::<Uuid>(row, "id"))
            .collect::<StoreResult<_>>()?;
        let mut items = self.load_items(&ids).await?;

        let orders = rows
            .iter()
            .map(|row| {
                let id: Uuid = col(row, "id")?;
                order_from_row(row, items.remove(&id).unwrap_or_default())
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(orders, page, total))
    }

    async fn count_orders_since(&mut self, since: Option<DateTime<Utc>>) -> StoreResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM orders WHERE ($1::timestamptz IS NULL OR created_at >= $1)",
        )
        .bind(since)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("count_orders_since", e))?;
        total_from_row(&row)
    }

    async fn revenue_since(&mut self, since: Option<DateTime<Utc>>) -> StoreResult<Decimal> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_amount), 0) AS revenue
            FROM orders
            WHERE payment_status = 'COMPLETED'
                AND ($1::timestamptz IS NULL OR created_at >= $1)
            "#,
        )
        .bind(since)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("revenue_since", e))?;
        col(&row, "revenue")
    }

    async fn count_orders_with_status(&mut self, status: OrderStatus) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM orders WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_orders_with_status", e))?;
        total_from_row(&row)
    }

    async fn daily_order_stats(&mut self, since: DateTime<Utc>) -> StoreResult<Vec<DailyStats>> {
        let rows = sqlx::query(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   COUNT(*) AS orders,
                   COALESCE(SUM(total_amount), 0) AS revenue
            FROM orders
            WHERE created_at >= $1
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("daily_order_stats", e))?;

        rows.iter()
            .map(|row| {
                Ok(DailyStats {
                    date: col::<NaiveDate>(row, "day")?,
                    orders: non_negative(col(row, "orders")?),
                    revenue: col(row, "revenue")?,
                })
            })
            .collect()
    }

    async fn sales_by_category(&mut self, since: DateTime<Utc>) -> StoreResult<Vec<CategorySales>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name AS category,
                   COUNT(*) AS orders,
                   COALESCE(SUM(oi.price * oi.quantity), 0) AS revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            JOIN categories c ON c.id = p.category_id
            WHERE o.created_at >= $1
            GROUP BY c.name
            ORDER BY revenue DESC, c.name
            "#,
        )
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("sales_by_category", e))?;

        rows.iter()
            .map(|row| {
                Ok(CategorySales {
                    category: col(row, "category")?,
                    orders: non_negative(col(row, "orders")?),
                    revenue: col(row, "revenue")?,
                })
            })
            .collect()
    }

    async fn top_products(&mut self, since: DateTime<Utc>, limit: u32) -> StoreResult<Vec<TopProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id AS product_id, p.name AS name, SUM(oi.quantity)::BIGINT AS sold
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.created_at >= $1
            GROUP BY p.id, p.name
            ORDER BY sold DESC, p.name
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(i64::from(limit))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("top_products", e))?;

        rows.iter()
            .map(|row| {
                let product_id: Uuid = col(row, "product_id")?;
                Ok(TopProduct {
                    product_id: ProductId::from_uuid(product_id),
                    name: col(row, "name")?,
                    sold: non_negative(col(row, "sold")?),
                })
            })
            .collect()
    }

    async fn reservations_for_order(&mut self, order_id: OrderId) -> StoreResult<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, released
            FROM reservations
            WHERE order_id = $1
            ORDER BY product_id
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("reservations_for_order", e))?;

        rows.iter()
            .map(|row| {
                let product_id: Uuid = col(row, "product_id")?;
                let quantity: i32 = col(row, "quantity")?;
                let released: bool = col(row, "released")?;
                Ok(Reservation::restore(
                    order_id,
                    ProductId::from_uuid(product_id),
                    to_u32(quantity, "quantity")?,
                    released,
                ))
            })
            .collect()
    }

    async fn save_reservation(&mut self, reservation: &Reservation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (order_id, product_id, quantity, released)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (order_id, product_id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                released = EXCLUDED.released
            "#,
        )
        .bind(reservation.order_id.as_uuid())
        .bind(reservation.product_id.as_uuid())
        .bind(to_i32(reservation.quantity, "quantity")?)
        .bind(reservation.is_released())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_reservation", e))?;
        Ok(())
    }

    async fn get_payment_by_intent(&mut self, intent_id: &str) -> StoreResult<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, intent_id, amount, currency, method, status, created_at
            FROM payments
            WHERE intent_id = $1
            "#,
        )
        .bind(intent_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_payment_by_intent", e))?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn get_payment_for_order(&mut self, order_id: OrderId) -> StoreResult<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, intent_id, amount, currency, method, status, created_at
            FROM payments
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_payment_for_order", e))?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn save_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (order_id, intent_id, amount, currency, method, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (order_id) DO UPDATE SET
                intent_id = EXCLUDED.intent_id,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                method = EXCLUDED.method,
                status = EXCLUDED.status,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(payment.order_id.as_uuid())
        .bind(&payment.intent_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_payment", e))?;
        Ok(())
    }

    async fn get_review(&mut self, id: ReviewId) -> StoreResult<Option<Review>> {
        let row = sqlx::query(
            "SELECT id, product_id, user_id, rating, comment, created_at FROM reviews WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_review", e))?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn find_review(&mut self, user_id: UserId, product_id: ProductId) -> StoreResult<Option<Review>> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, user_id, rating, comment, created_at
            FROM reviews
            WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_review", e))?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn save_review(&mut self, review: &Review) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, product_id, user_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                rating = EXCLUDED.rating,
                comment = EXCLUDED.comment
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.product_id.as_uuid())
        .bind(review.user_id.as_uuid())
        .bind(i16::from(review.rating))
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_review", e))?;
        Ok(())
    }

    async fn delete_review(&mut self, id: ReviewId) -> StoreResult<()> {
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_review", e))?;
        Ok(())
    }

    async fn list_reviews(&mut self, product_id: ProductId, page: PageRequest) -> StoreResult<Page<Review>> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM reviews WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_reviews", e))?;
        let total = total_from_row(&row)?;

        let rows = sqlx::query(
            r#"
            SELECT id, product_id, user_id, rating, comment, created_at
            FROM reviews
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(page.size))
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_reviews", e))?;

        let reviews = rows.iter().map(review_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(reviews, page, total))
    }

    async fn ratings_for_product(&mut self, product_id: ProductId) -> StoreResult<Vec<u8>> {
        let rows = sqlx::query("SELECT rating FROM reviews WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("ratings_for_product", e))?;
        rows.iter()
            .map(|row| {
                let rating: i16 = col(row, "rating")?;
                u8::try_from(rating).map_err(|_| StoreError::Serialization(format!("rating {rating}")))
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

impl PostgresUnit {
    async fn count(&mut self, operation: &'static str, sql: &'static str) -> StoreResult<u64> {
        let row = sqlx::query(sql)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        total_from_row(&row)
    }

    async fn load_cart(
        &mut self,
        sql: &'static str,
        user_id: UserId,
        operation: &'static str,
    ) -> StoreResult<Option<Cart>> {
        let rows = sqlx::query(sql)
            .bind(user_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let product_id: Uuid = col(row, "product_id")?;
            let quantity: i32 = col(row, "quantity")?;
            lines.push((ProductId::from_uuid(product_id), to_u32(quantity, "quantity")?));
        }
        Ok(Some(Cart::restore(user_id, lines)))
    }

    async fn load_order(&mut self, sql: &str, id: OrderId, operation: &'static str) -> StoreResult<Option<Order>> {
        let row = sqlx::query(sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut items = self.load_items(&[*id.as_uuid()]).await?;
        order_from_row(&row, items.remove(id.as_uuid()).unwrap_or_default()).map(Some)
    }

    async fn load_items(&mut self, order_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<OrderItem>>> {
        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(by_order);
        }

        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, product_image, quantity, price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            "#,
        )
        .bind(order_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("load_order_items", e))?;

        for row in &rows {
            let order_id: Uuid = col(row, "order_id")?;
            let product_id: Uuid = col(row, "product_id")?;
            let quantity: i32 = col(row, "quantity")?;
            by_order.entry(order_id).or_default().push(OrderItem {
                product_id: ProductId::from_uuid(product_id),
                product_name: col(row, "product_name")?,
                product_image: col(row, "product_image")?,
                quantity: to_u32(quantity, "quantity")?,
                price: col(row, "price")?,
            });
        }
        Ok(by_order)
    }
}

const PRODUCT_SEARCH: &str = r#"
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE ($1::text IS NULL OR p.name ILIKE '%' || $1 || '%' ESCAPE '\')
        AND ($2::uuid IS NULL OR p.category_id = $2)
        AND ($3::text IS NULL OR LOWER(c.name) = LOWER($3))
        AND ($4::numeric IS NULL OR p.price >= $4)
        AND ($5::numeric IS NULL OR p.price <= $5)
        AND ($6::boolean IS NULL OR p.in_stock = $6)
        AND ($7::boolean IS NULL OR p.featured = $7)
        AND ($8::boolean IS NULL OR p.is_new = $8)
"#;

fn bind_filter<'q>(
    query: Query<'q, Postgres, PgArguments>,
    filter: &'q ProductFilter,
) -> Query<'q, Postgres, PgArguments> {
    let name: Option<String> = filter
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(escape_like);
    query
        .bind(name)
        .bind(filter.category_id.map(|c| *c.as_uuid()))
        .bind(filter.category.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.in_stock)
        .bind(filter.featured)
        .bind(filter.is_new)
}

/// Make `%`, `_` and `\` in a user-supplied name match literally under
/// `ILIKE ... ESCAPE '\'`.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            if db_err.code().as_deref() == Some("23505") {
                StoreError::Conflict(format!("{operation}: {message}"))
            } else {
                StoreError::Database { operation, message }
            }
        }
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::Serialization(format!("{operation}: column {index}: {source}"))
        }
        other => StoreError::Database {
            operation,
            message: other.to_string(),
        },
    }
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Serialization(format!("failed to read {name}: {e}")))
}

fn total_from_row(row: &PgRow) -> StoreResult<u64> {
    col::<i64>(row, "total").map(non_negative)
}

fn non_negative(count: i64) -> u64 {
    count.max(0) as u64
}

fn to_i32(value: u32, what: &str) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Serialization(format!("{what} {value} out of range")))
}

fn to_u32(value: i32, what: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Serialization(format!("{what} {value} is negative")))
}

fn parse_column<T: core::str::FromStr>(raw: &str, what: &str) -> StoreResult<T> {
    raw.parse()
        .map_err(|_| StoreError::Serialization(format!("unknown {what} '{raw}'")))
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let id: Uuid = col(row, "id")?;
    let role: String = col(row, "role")?;
    Ok(User {
        id: UserId::from_uuid(id),
        email: col(row, "email")?,
        display_name: col(row, "display_name")?,
        phone: col(row, "phone")?,
        address: col(row, "address")?,
        avatar: col(row, "avatar")?,
        role: parse_column::<Role>(&role, "role")?,
        enabled: col(row, "enabled")?,
        created_at: col(row, "created_at")?,
    })
}

fn category_from_row(row: &PgRow) -> StoreResult<Category> {
    let id: Uuid = col(row, "id")?;
    Ok(Category {
        id: CategoryId::from_uuid(id),
        name: col(row, "name")?,
        description: col(row, "description")?,
        image: col(row, "image")?,
    })
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let id: Uuid = col(row, "id")?;
    let stock: i32 = col(row, "stock_count")?;
    let category_id: Option<Uuid> = col(row, "category_id")?;
    Ok(Product::restore(
        ProductId::from_uuid(id),
        col(row, "name")?,
        col(row, "description")?,
        col(row, "price")?,
        col(row, "original_price")?,
        to_u32(stock, "stock_count")?,
        col(row, "featured")?,
        col(row, "is_new")?,
        col(row, "image")?,
        col(row, "tags")?,
        category_id.map(CategoryId::from_uuid),
        col(row, "created_at")?,
    ))
}

fn order_from_row(row: &PgRow, items: Vec<OrderItem>) -> StoreResult<Order> {
    let id: Uuid = col(row, "id")?;
    let user_id: Uuid = col(row, "user_id")?;
    let status: String = col(row, "status")?;
    let payment_status: String = col(row, "payment_status")?;
    Ok(Order::restore(
        OrderId::from_uuid(id),
        UserId::from_uuid(user_id),
        items,
        col(row, "total_amount")?,
        parse_column(&status, "order status")?,
        parse_column(&payment_status, "payment status")?,
        col(row, "shipping_address")?,
        col(row, "payment_id")?,
        col(row, "created_at")?,
        col(row, "updated_at")?,
    ))
}

fn payment_from_row(row: &PgRow) -> StoreResult<Payment> {
    let order_id: Uuid = col(row, "order_id")?;
    let method: String = col(row, "method")?;
    let status: String = col(row, "status")?;
    Ok(Payment {
        intent_id: col(row, "intent_id")?,
        order_id: OrderId::from_uuid(order_id),
        amount: col(row, "amount")?,
        currency: col(row, "currency")?,
        method: parse_column(&method, "payment method")?,
        status: parse_column(&status, "payment status")?,
        created_at: col(row, "created_at")?,
    })
}

fn review_from_row(row: &PgRow) -> StoreResult<Review> {
    let id: Uuid = col(row, "id")?;
    let product_id: Uuid = col(row, "product_id")?;
    let user_id: Uuid = col(row, "user_id")?;
    let rating: i16 = col(row, "rating")?;
    Ok(Review {
        id: ReviewId::from_uuid(id),
        product_id: ProductId::from_uuid(product_id),
        user_id: UserId::from_uuid(user_id),
        rating: u8::try_from(rating)
            .map_err(|_| StoreError::Serialization(format!("rating {rating}")))?,
        comment: col(row, "comment")?,
        created_at: col(row, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_in_names_are_escaped() {
        assert_eq!(escape_like("50% off"), "50\\% off");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like(r"C:\dir"), r"C:\\dir");
        assert_eq!(escape_like("plain"), "plain");
    }
}
