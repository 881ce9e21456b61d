//! Shared fixtures for service and workflow tests.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use shopfront_auth::{Actor, Role, User};
use shopfront_catalog::{NewProduct, NewReview, Product};
use shopfront_core::{OrderId, ProductId, UserId};
use shopfront_sales::Cart;

use crate::notify::OrderEventBus;
use crate::services::Services;
use crate::store::{InMemoryStore, Store};

pub(crate) fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub(crate) struct Fixture {
    pub store: InMemoryStore,
    pub bus: Arc<OrderEventBus>,
    pub services: Services,
}

impl Fixture {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let bus = Arc::new(OrderEventBus::new());
        let services = Services::new(Arc::new(store.clone()), bus.clone());
        Self { store, bus, services }
    }

    pub fn email_of(&self, actor: &Actor) -> String {
        format!("user-{}@example.com", actor.user_id)
    }

    async fn user(&self, role: Role) -> Actor {
        let actor = Actor::new(UserId::new(), role);
        let user = User::new(actor.user_id, &self.email_of(&actor), None, role, Utc::now()).unwrap();
        self.services.users.provision(user).await.unwrap();
        actor
    }

    pub async fn customer(&self) -> Actor {
        self.user(Role::Customer).await
    }

    pub async fn admin(&self) -> Actor {
        self.user(Role::Admin).await
    }

    /// Insert a product straight into the store.
    pub async fn product(&self, name: &str, price: &str, stock: u32) -> ProductId {
        let input = NewProduct {
            name: name.into(),
            price: dec(price),
            stock_count: stock,
            ..NewProduct::default()
        };
        let product = Product::create(ProductId::new(), input, Utc::now()).unwrap();
        let mut uow = self.store.begin().await.unwrap();
        uow.save_product(&product).await.unwrap();
        uow.commit().await.unwrap();
        product.id
    }

    pub async fn stock(&self, id: ProductId) -> u32 {
        let mut uow = self.store.begin().await.unwrap();
        let product = uow.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.in_stock(), product.stock_count() > 0);
        product.stock_count()
    }

    /// Fill the cart through the cart service.
    pub async fn cart(&self, actor: &Actor, lines: &[(ProductId, u32)]) {
        for &(product_id, quantity) in lines {
            self.services.cart.add_item(actor, product_id, quantity).await.unwrap();
        }
    }

    /// Write cart lines directly, skipping stock checks.
    pub async fn raw_cart(&self, actor: &Actor, lines: &[(ProductId, u32)]) {
        let cart = Cart::restore(actor.user_id, lines.iter().copied());
        let mut uow = self.store.begin().await.unwrap();
        uow.save_cart(&cart).await.unwrap();
        uow.commit().await.unwrap();
    }

    /// Create products `(name, price, stock, quantity)`, cart them and place
    /// an order.
    pub async fn placed_order(&self, actor: &Actor, lines: &[(&str, &str, u32, u32)]) -> OrderId {
        for &(name, price, stock, quantity) in lines {
            let id = self.product(name, price, stock).await;
            self.cart(actor, &[(id, quantity)]).await;
        }
        self.services.orders.create_order(actor, "1 Main St").await.unwrap().id
    }

    /// Review by a fresh customer.
    pub async fn review(&self, product_id: ProductId, rating: u8) {
        let reviewer = self.customer().await;
        let input = NewReview {
            product_id,
            rating,
            comment: None,
        };
        self.services.reviews.create(&reviewer, input).await.unwrap();
    }
}
