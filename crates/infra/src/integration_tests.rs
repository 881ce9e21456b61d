//! End-to-end tests for the order workflow.
//!
//! Cart → order → payment → cancellation, run against the in-memory store,
//! checking stock, status and the events published on the order bus.

#[cfg(test)]
mod tests {
    use shopfront_core::{DomainError, ProductId};
    use shopfront_events::EventBus;
    use shopfront_sales::{OrderEvent, OrderStatus, PaymentStatus};

    use crate::test_support::{Fixture, dec};

    #[tokio::test]
    async fn order_totals_debits_stock_and_empties_cart() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let a = fx.product("A", "10.00", 5).await;
        let b = fx.product("B", "5.00", 3).await;
        fx.cart(&user, &[(a, 2), (b, 1)]).await;

        let order = fx.services.orders.create_order(&user, "1 Main St").await.unwrap();

        assert_eq!(order.total_amount, dec("25.00"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.items.len(), 2);
        assert_eq!(fx.stock(a).await, 3);
        assert_eq!(fx.stock(b).await, 2);
        assert_eq!(fx.services.cart.get_cart(&user).await.unwrap().total_items, 0);
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_product_unchanged() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let a = fx.product("A", "10.00", 1).await;
        fx.raw_cart(&user, &[(a, 2)]).await;

        let err = fx.services.orders.create_order(&user, "1 Main St").await.unwrap_err();

        assert!(matches!(err.as_domain(), Some(DomainError::InsufficientStock { .. })));
        assert_eq!(fx.stock(a).await, 1);
        assert_eq!(fx.services.cart.get_cart(&user).await.unwrap().total_items, 2);
    }

    #[tokio::test]
    async fn failure_on_a_later_line_rolls_back_earlier_reservations() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let mut ids = [fx.product("X", "1", 5).await, fx.product("Y", "1", 5).await];
        ids.sort();
        let [first, second] = ids;
        fx.raw_cart(&user, &[(first, 1), (second, 6)]).await;

        let err = fx.services.orders.create_order(&user, "1 Main St").await.unwrap_err();

        assert!(matches!(err.as_domain(), Some(DomainError::InsufficientStock { .. })));
        assert_eq!(fx.stock(first).await, 5);
        assert_eq!(fx.stock(second).await, 5);
    }

    #[tokio::test]
    async fn cancel_restores_stock_once() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let a = fx.product("A", "10.00", 5).await;
        let b = fx.product("B", "5.00", 3).await;
        fx.cart(&user, &[(a, 2), (b, 1)]).await;
        let order = fx.services.orders.create_order(&user, "1 Main St").await.unwrap();

        let cancelled = fx.services.orders.cancel_order(&user, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(fx.stock(a).await, 5);
        assert_eq!(fx.stock(b).await, 3);

        let err = fx.services.orders.cancel_order(&user, order.id).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidTransition { .. })));
        assert_eq!(fx.stock(a).await, 5);
        assert_eq!(fx.stock(b).await, 3);
    }

    #[tokio::test]
    async fn shipped_orders_cannot_be_cancelled() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let admin = fx.admin().await;
        let order = fx.placed_order(&user, &[("A", "10", 5, 1)]).await;
        for status in [OrderStatus::Confirmed, OrderStatus::Shipped] {
            fx.services.orders.update_status(&admin, order, status).await.unwrap();
        }

        let err = fx.services.orders.cancel_order(&user, order).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidTransition { .. })));
        let err = fx.services.orders.cancel_order(&admin, order).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn confirm_payment_unknown_and_pending() {
        let fx = Fixture::new();
        let user = fx.customer().await;

        let err = fx.services.payments.confirm("pi_missing").await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));

        let order = fx.placed_order(&user, &[("A", "10", 5, 1)]).await;
        let intent = fx.services.payments.create_intent(&user, order).await.unwrap();
        let status = fx.services.payments.confirm(&intent.payment_intent_id).await.unwrap();
        assert_eq!(status.status, PaymentStatus::Completed);
        assert_eq!(status.order_status, OrderStatus::Confirmed);

        let view = fx.services.orders.get_order(&user, order).await.unwrap();
        assert_eq!(view.payment_status, PaymentStatus::Completed);
        assert_eq!(view.status, OrderStatus::Confirmed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_for_the_last_unit() {
        let fx = Fixture::new();
        let last = fx.product("Last", "10", 1).await;
        let alice = fx.customer().await;
        let bob = fx.customer().await;
        fx.cart(&alice, &[(last, 1)]).await;
        fx.cart(&bob, &[(last, 1)]).await;

        let (a, b) = tokio::join!(
            fx.services.orders.create_order(&alice, "1 Main St"),
            fx.services.orders.create_order(&bob, "2 Main St"),
        );

        let (won, lost) = match (a, b) {
            (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
            other => panic!("expected exactly one winner, got {other:?}"),
        };
        assert_eq!(won.items[0].quantity, 1);
        assert!(matches!(lost.as_domain(), Some(DomainError::InsufficientStock { .. })));
        assert_eq!(fx.stock(last).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn double_checkout_of_one_cart_places_one_order() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let product = fx.product("Lamp", "10", 10).await;
        fx.cart(&user, &[(product, 2)]).await;

        let first = fx.services.orders.clone();
        let second = fx.services.orders.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { first.create_order(&user, "1 Main St").await }),
            tokio::spawn(async move { second.create_order(&user, "1 Main St").await }),
        );

        let (placed, rejected) = match (a.unwrap(), b.unwrap()) {
            (Ok(placed), Err(rejected)) | (Err(rejected), Ok(placed)) => (placed, rejected),
            other => panic!("expected exactly one order, got {other:?}"),
        };
        assert_eq!(placed.total_amount, dec("20"));
        assert_eq!(rejected.as_domain(), Some(&DomainError::EmptyCart));
        assert_eq!(fx.stock(product).await, 8);
        let page = fx.services.orders.list_orders(&user, Default::default()).await.unwrap();
        assert_eq!(page.total_elements, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_buyers_never_oversell() {
        let fx = Fixture::new();
        let product = fx.product("Hot", "3", 5).await;
        let mut buyers = Vec::new();
        for _ in 0..12 {
            let buyer = fx.customer().await;
            fx.raw_cart(&buyer, &[(product, 1)]).await;
            buyers.push(buyer);
        }

        let mut handles = Vec::new();
        for buyer in buyers {
            let orders = fx.services.orders.clone();
            handles.push(tokio::spawn(async move { orders.create_order(&buyer, "1 Main St").await }));
        }
        let mut placed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                placed += 1;
            }
        }

        assert_eq!(placed, 5);
        assert_eq!(fx.stock(product).await, 0);
    }

    #[tokio::test]
    async fn lifecycle_publishes_events_in_order() {
        let fx = Fixture::new();
        let sub = fx.bus.subscribe();
        let user = fx.customer().await;
        let admin = fx.admin().await;

        let order = fx.placed_order(&user, &[("A", "10", 5, 1)]).await;
        let intent = fx.services.payments.create_intent(&user, order).await.unwrap();
        fx.services.payments.confirm(&intent.payment_intent_id).await.unwrap();
        fx.services.orders.update_status(&admin, order, OrderStatus::Shipped).await.unwrap();

        // Publishing is synchronous, so every event is already queued.
        assert!(matches!(sub.recv().unwrap(), OrderEvent::OrderPlaced { order_id, .. } if order_id == order));
        assert!(matches!(sub.recv().unwrap(), OrderEvent::PaymentCompleted { .. }));
        match sub.recv().unwrap() {
            OrderEvent::OrderStatusChanged { from, to, .. } => {
                assert_eq!(from, OrderStatus::Confirmed);
                assert_eq!(to, OrderStatus::Shipped);
            }
            other => panic!("unexpected event {other:?}"),
        }
        drop(fx);
        assert!(sub.recv().is_err());
    }

    #[tokio::test]
    async fn failed_order_publishes_nothing() {
        let fx = Fixture::new();
        let sub = fx.bus.subscribe();
        let user = fx.customer().await;
        fx.raw_cart(&user, &[(ProductId::new(), 1)]).await;

        assert!(fx.services.orders.create_order(&user, "1 Main St").await.is_err());
        drop(fx);
        assert!(sub.recv().is_err());
    }
}
