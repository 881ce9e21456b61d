//! In-memory store for tests and local development.
//!
//! A unit of work owns the store's async mutex for its whole lifetime and
//! writes to a private copy of the data, which replaces the shared state on
//! commit. Units are therefore fully serialized, and an uncommitted unit
//! leaves no trace.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use shopfront_auth::User;
use shopfront_catalog::{Category, Product, ProductFilter, ProductSort, Review};
use shopfront_core::{CategoryId, OrderId, Page, PageRequest, ProductId, ReviewId, UserId};
use shopfront_inventory::Reservation;
use shopfront_sales::{Cart, Order, OrderStatus, Payment, PaymentStatus, Wishlist};

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::views::{CategorySales, DailyStats, TopProduct};

#[derive(Debug, Clone, Default)]
struct State {
    users: HashMap<UserId, User>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    wishlists: HashMap<UserId, Wishlist>,
    orders: HashMap<OrderId, Order>,
    reservations: HashMap<OrderId, Vec<Reservation>>,
    payments: HashMap<OrderId, Payment>,
    reviews: HashMap<ReviewId, Review>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnit { guard, working }))
    }
}

struct InMemoryUnit {
    guard: OwnedMutexGuard<State>,
    working: State,
}

fn count(n: usize) -> u64 {
    n as u64
}

fn checked_add(a: Decimal, b: Decimal) -> StoreResult<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| StoreError::Serialization("revenue total overflows".into()))
}

impl InMemoryUnit {
    fn orders_since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &Order> {
        self.working.orders.values().filter(move |o| o.created_at >= since)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnit {
    async fn get_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn count_users(&mut self) -> StoreResult<u64> {
        Ok(count(self.working.users.len()))
    }

    async fn list_users(&mut self, page: PageRequest) -> StoreResult<Page<User>> {
        let mut users: Vec<User> = self.working.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page.slice(users))
    }

    async fn delete_user(&mut self, id: UserId) -> StoreResult<()> {
        self.working.users.remove(&id);
        self.working.carts.remove(&id);
        self.working.wishlists.remove(&id);
        self.working.reviews.retain(|_, r| r.user_id != id);
        Ok(())
    }

    async fn user_has_orders(&mut self, id: UserId) -> StoreResult<bool> {
        Ok(self.working.orders.values().any(|o| o.user_id == id))
    }

    async fn get_category(&mut self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.working.categories.get(&id).cloned())
    }

    async fn find_category_by_name(&mut self, name: &str) -> StoreResult<Option<Category>> {
        Ok(self.working.categories.values().find(|c| c.name == name).cloned())
    }

    async fn list_categories(&mut self) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.working.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn save_category(&mut self, category: &Category) -> StoreResult<()> {
        self.working.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category(&mut self, id: CategoryId) -> StoreResult<()> {
        self.working.categories.remove(&id);
        Ok(())
    }

    async fn count_products_in_category(&mut self, id: CategoryId) -> StoreResult<u64> {
        Ok(count(
            self.working
                .products
                .values()
                .filter(|p| p.category_id == Some(id))
                .count(),
        ))
    }

    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        // The whole data set is already exclusively held by this unit.
        self.get_product(id).await
    }

    async fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        self.working.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()> {
        self.working.products.remove(&id);
        for cart in self.working.carts.values_mut() {
            cart.remove(id);
        }
        for wishlist in self.working.wishlists.values_mut() {
            wishlist.remove(id);
        }
        self.working.reviews.retain(|_, r| r.product_id != id);
        Ok(())
    }

    async fn search_products(
        &mut self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> StoreResult<Page<Product>> {
        let categories = &self.working.categories;
        let mut matches: Vec<Product> = self
            .working
            .products
            .values()
            .filter(|p| {
                let category_name = p
                    .category_id
                    .and_then(|id| categories.get(&id))
                    .map(|c| c.name.as_str());
                filter.matches(p, category_name)
            })
            .cloned()
            .collect();
        sort.sort(&mut matches);
        Ok(page.slice(matches))
    }

    async fn count_products(&mut self) -> StoreResult<u64> {
        Ok(count(self.working.products.len()))
    }

    async fn product_has_orders(&mut self, id: ProductId) -> StoreResult<bool> {
        Ok(self
            .working
            .orders
            .values()
            .any(|o| o.items().iter().any(|i| i.product_id == id)))
    }

    async fn get_cart(&mut self, user_id: UserId) -> StoreResult<Option<Cart>> {
        Ok(self.working.carts.get(&user_id).cloned())
    }

    async fn lock_cart(&mut self, user_id: UserId) -> StoreResult<Option<Cart>> {
        self.get_cart(user_id).await
    }

    async fn save_cart(&mut self, cart: &Cart) -> StoreResult<()> {
        self.working.carts.insert(cart.user_id, cart.clone());
        Ok(())
    }

    async fn get_wishlist(&mut self, user_id: UserId) -> StoreResult<Option<Wishlist>> {
        Ok(self.working.wishlists.get(&user_id).cloned())
    }

    async fn save_wishlist(&mut self, wishlist: &Wishlist) -> StoreResult<()> {
        self.working.wishlists.insert(wishlist.user_id, wishlist.clone());
        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        self.get_order(id).await
    }

    async fn save_order(&mut self, order: &Order) -> StoreResult<()> {
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn list_orders(&mut self, user_id: Option<UserId>, page: PageRequest) -> StoreResult<Page<Order>> {
        let mut orders: Vec<Order> = self
            .working
            .orders
            .values()
            .filter(|o| user_id.is_none_or(|u| o.user_id == u))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page.slice(orders))
    }

    async fn count_orders_since(&mut self, since: Option<DateTime<Utc>>) -> StoreResult<u64> {
        Ok(count(
            self.working
                .orders
                .values()
                .filter(|o| since.is_none_or(|s| o.created_at >= s))
                .count(),
        ))
    }

    async fn revenue_since(&mut self, since: Option<DateTime<Utc>>) -> StoreResult<Decimal> {
        Ok(self
            .working
            .orders
            .values()
            .filter(|o| o.payment_status() == PaymentStatus::Completed)
            .filter(|o| since.is_none_or(|s| o.created_at >= s))
            .map(Order::total_amount)
            .sum())
    }

    async fn count_orders_with_status(&mut self, status: OrderStatus) -> StoreResult<u64> {
        Ok(count(
            self.working
                .orders
                .values()
                .filter(|o| o.status() == status)
                .count(),
        ))
    }

    async fn daily_order_stats(&mut self, since: DateTime<Utc>) -> StoreResult<Vec<DailyStats>> {
        let mut days: BTreeMap<NaiveDate, (u64, Decimal)> = BTreeMap::new();
        for order in self.orders_since(since) {
            let day = days.entry(order.created_at.date_naive()).or_default();
            day.0 += 1;
            day.1 = checked_add(day.1, order.total_amount())?;
        }
        Ok(days
            .into_iter()
            .map(|(date, (orders, revenue))| DailyStats { date, orders, revenue })
            .collect())
    }

    async fn sales_by_category(&mut self, since: DateTime<Utc>) -> StoreResult<Vec<CategorySales>> {
        let mut by_category: HashMap<String, (u64, Decimal)> = HashMap::new();
        for order in self.orders_since(since) {
            for item in order.items() {
                let Some(category) = self
                    .working
                    .products
                    .get(&item.product_id)
                    .and_then(|p| p.category_id)
                    .and_then(|id| self.working.categories.get(&id))
                else {
                    continue;
                };
                let subtotal = item
                    .subtotal()
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                let entry = by_category.entry(category.name.clone()).or_default();
                entry.0 += 1;
                entry.1 = checked_add(entry.1, subtotal)?;
            }
        }
        let mut sales: Vec<CategorySales> = by_category
            .into_iter()
            .map(|(category, (orders, revenue))| CategorySales { category, orders, revenue })
            .collect();
        sales.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.category.cmp(&b.category)));
        Ok(sales)
    }

    async fn top_products(&mut self, since: DateTime<Utc>, limit: u32) -> StoreResult<Vec<TopProduct>> {
        let mut sold: HashMap<ProductId, u64> = HashMap::new();
        for order in self.orders_since(since) {
            for item in order.items() {
                *sold.entry(item.product_id).or_default() += u64::from(item.quantity);
            }
        }
        let mut top: Vec<TopProduct> = sold
            .into_iter()
            .filter_map(|(product_id, sold)| {
                let name = self.working.products.get(&product_id)?.name.clone();
                Some(TopProduct { product_id, name, sold })
            })
            .collect();
        top.sort_by(|a, b| b.sold.cmp(&a.sold).then_with(|| a.name.cmp(&b.name)));
        top.truncate(limit as usize);
        Ok(top)
    }

    async fn reservations_for_order(&mut self, order_id: OrderId) -> StoreResult<Vec<Reservation>> {
        let mut reservations = self
            .working
            .reservations
            .get(&order_id)
            .cloned()
            .unwrap_or_default();
        reservations.sort_by_key(|r| r.product_id);
        Ok(reservations)
    }

    async fn save_reservation(&mut self, reservation: &Reservation) -> StoreResult<()> {
        let entries = self.working.reservations.entry(reservation.order_id).or_default();
        match entries.iter_mut().find(|r| r.product_id == reservation.product_id) {
            Some(existing) => *existing = reservation.clone(),
            None => entries.push(reservation.clone()),
        }
        Ok(())
    }

    async fn get_payment_by_intent(&mut self, intent_id: &str) -> StoreResult<Option<Payment>> {
        Ok(self
            .working
            .payments
            .values()
            .find(|p| p.intent_id == intent_id)
            .cloned())
    }

    async fn get_payment_for_order(&mut self, order_id: OrderId) -> StoreResult<Option<Payment>> {
        Ok(self.working.payments.get(&order_id).cloned())
    }

    async fn save_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        self.working.payments.insert(payment.order_id, payment.clone());
        Ok(())
    }

    async fn get_review(&mut self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.working.reviews.get(&id).cloned())
    }

    async fn find_review(&mut self, user_id: UserId, product_id: ProductId) -> StoreResult<Option<Review>> {
        Ok(self
            .working
            .reviews
            .values()
            .find(|r| r.user_id == user_id && r.product_id == product_id)
            .cloned())
    }

    async fn save_review(&mut self, review: &Review) -> StoreResult<()> {
        self.working.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn delete_review(&mut self, id: ReviewId) -> StoreResult<()> {
        self.working.reviews.remove(&id);
        Ok(())
    }

    async fn list_reviews(&mut self, product_id: ProductId, page: PageRequest) -> StoreResult<Page<Review>> {
        let mut reviews: Vec<Review> = self
            .working
            .reviews
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page.slice(reviews))
    }

    async fn ratings_for_product(&mut self, product_id: ProductId) -> StoreResult<Vec<u8>> {
        Ok(self
            .working
            .reviews
            .values()
            .filter(|r| r.product_id == product_id)
            .map(|r| r.rating)
            .collect())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryUnit { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
