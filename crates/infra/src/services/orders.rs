use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{Span, info, instrument};

use shopfront_auth::{Actor, ensure_admin, ensure_owner_or_admin};
use shopfront_core::{DomainError, OrderId, Page, PageRequest, UserId};
use shopfront_catalog::Product;
use shopfront_inventory::{Reservation, release, reserve};
use shopfront_sales::{Cart, Order, OrderEvent, OrderItem, OrderStatus};

use crate::notify::{OrderEventBus, publish};
use crate::services::{ServiceResult, user_email};
use crate::store::{Store, UnitOfWork};
use crate::views::OrderView;

/// Cart to order conversion and the order lifecycle.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    bus: Arc<OrderEventBus>,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, bus: Arc<OrderEventBus>) -> Self {
        Self { store, bus }
    }

    /// Turn the actor's cart into a pending order.
    ///
    /// Products are locked and debited in ascending id order. Any failure
    /// drops the unit of work, so no reservation made earlier in the call
    /// survives.
    #[instrument(skip(self, actor, shipping_address), fields(user_id = %actor.user_id, order_id = tracing::field::Empty), err)]
    pub async fn create_order(&self, actor: &Actor, shipping_address: &str) -> ServiceResult<OrderView> {
        let mut uow = self.store.begin().await?;

        let mut cart = uow
            .lock_cart(actor.user_id)
            .await?
            .unwrap_or_else(|| Cart::new(actor.user_id));
        if cart.is_empty() {
            return Err(DomainError::EmptyCart.into());
        }
        if shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping address must not be blank").into());
        }

        let order_id = OrderId::new();
        Span::current().record("order_id", tracing::field::display(order_id));
        let now = Utc::now();

        let mut items = Vec::new();
        let mut reservations = Vec::new();
        for (product_id, quantity) in cart.lines() {
            let mut product = uow
                .lock_product(product_id)
                .await?
                .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))?;

            reservations.push(reserve(&mut product, order_id, quantity)?);
            items.push(OrderItem {
                product_id,
                product_name: product.name.clone(),
                product_image: product.image.clone(),
                quantity,
                price: product.price,
            });
            uow.save_product(&product).await?;
        }

        let order = Order::place(order_id, actor.user_id, items, shipping_address, now)?;
        uow.save_order(&order).await?;
        for reservation in &reservations {
            uow.save_reservation(reservation).await?;
        }
        cart.clear();
        uow.save_cart(&cart).await?;

        let email = user_email(uow.as_mut(), actor.user_id).await?;
        uow.commit().await?;

        info!(total = %order.total_amount(), lines = order.items().len(), "order placed");
        publish(
            &self.bus,
            OrderEvent::OrderPlaced {
                order_id: order.id,
                user_id: order.user_id,
                total_amount: order.total_amount(),
                occurred_at: now,
            },
        );
        Ok(OrderView::new(&order, email))
    }

    /// Cancel a pending or confirmed order and put its stock back.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn cancel_order(&self, actor: &Actor, order_id: OrderId) -> ServiceResult<OrderView> {
        let mut uow = self.store.begin().await?;
        let mut order = lock_existing(uow.as_mut(), order_id).await?;
        ensure_owner_or_admin(actor, order.user_id)?;

        let from = order.status();
        if !from.can_transition_to(OrderStatus::Cancelled) {
            return Err(DomainError::invalid_transition(from, OrderStatus::Cancelled).into());
        }

        let now = Utc::now();
        release_reservations(uow.as_mut(), order_id).await?;
        order.transition_to(OrderStatus::Cancelled, now)?;
        uow.save_order(&order).await?;

        let email = user_email(uow.as_mut(), order.user_id).await?;
        uow.commit().await?;

        info!(%from, "order cancelled");
        publish(
            &self.bus,
            OrderEvent::OrderCancelled {
                order_id,
                user_id: order.user_id,
                occurred_at: now,
            },
        );
        Ok(OrderView::new(&order, email))
    }

    /// Admin status change. Moving to `CANCELLED` releases stock like
    /// [`OrderService::cancel_order`].
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn update_status(&self, actor: &Actor, order_id: OrderId, next: OrderStatus) -> ServiceResult<OrderView> {
        ensure_admin(actor)?;

        let mut uow = self.store.begin().await?;
        let mut order = lock_existing(uow.as_mut(), order_id).await?;

        let from = order.status();
        if !from.can_transition_to(next) {
            return Err(DomainError::invalid_transition(from, next).into());
        }

        let now = Utc::now();
        if next == OrderStatus::Cancelled {
            release_reservations(uow.as_mut(), order_id).await?;
        }
        order.transition_to(next, now)?;
        uow.save_order(&order).await?;

        let email = user_email(uow.as_mut(), order.user_id).await?;
        uow.commit().await?;

        info!(%from, to = %next, "order status changed");
        publish(
            &self.bus,
            OrderEvent::OrderStatusChanged {
                order_id,
                user_id: order.user_id,
                from,
                to: next,
                occurred_at: now,
            },
        );
        Ok(OrderView::new(&order, email))
    }

    pub async fn get_order(&self, actor: &Actor, order_id: OrderId) -> ServiceResult<OrderView> {
        let mut uow = self.store.begin().await?;
        let order = uow
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
        ensure_owner_or_admin(actor, order.user_id)?;

        let email = user_email(uow.as_mut(), order.user_id).await?;
        Ok(OrderView::new(&order, email))
    }

    /// The actor's own orders, newest first.
    pub async fn list_orders(&self, actor: &Actor, page: PageRequest) -> ServiceResult<Page<OrderView>> {
        self.list(Some(actor.user_id), page).await
    }

    /// Every user's orders. Admin only.
    pub async fn list_all_orders(&self, actor: &Actor, page: PageRequest) -> ServiceResult<Page<OrderView>> {
        ensure_admin(actor)?;
        self.list(None, page).await
    }

    async fn list(&self, user_id: Option<UserId>, page: PageRequest) -> ServiceResult<Page<OrderView>> {
        let mut uow = self.store.begin().await?;
        let orders = uow.list_orders(user_id, page).await?;

        let mut emails: HashMap<UserId, Option<String>> = HashMap::new();
        for order in orders.items.iter() {
            if !emails.contains_key(&order.user_id) {
                let email = user_email(uow.as_mut(), order.user_id).await?;
                emails.insert(order.user_id, email);
            }
        }
        Ok(orders.map(|order| {
            let email = emails.get(&order.user_id).cloned().flatten();
            OrderView::new(&order, email)
        }))
    }
}

async fn lock_existing(uow: &mut dyn UnitOfWork, order_id: OrderId) -> ServiceResult<Order> {
    uow.lock_order(order_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("order {order_id}")).into())
}

/// Credit back every reservation of the order, locking products in
/// ascending id order.
async fn release_reservations(uow: &mut dyn UnitOfWork, order_id: OrderId) -> ServiceResult<()> {
    let mut reservations = uow.reservations_for_order(order_id).await?;
    reservations.sort_by_key(|r| r.product_id);

    for mut reservation in reservations {
        let mut product = lock_reserved_product(uow, &reservation).await?;
        release(&mut product, &mut reservation)?;
        uow.save_product(&product).await?;
        uow.save_reservation(&reservation).await?;
    }
    Ok(())
}

async fn lock_reserved_product(uow: &mut dyn UnitOfWork, reservation: &Reservation) -> ServiceResult<Product> {
    uow.lock_product(reservation.product_id).await?.ok_or_else(|| {
        DomainError::invariant(format!(
            "order {} reserves missing product {}",
            reservation.order_id, reservation.product_id
        ))
        .into()
    })
}
