//! Fire-and-forget order notifications.
//!
//! Services publish [`OrderEvent`]s on the bus after their transaction
//! committed; a blocking worker drains a subscription and hands each event to
//! a [`Notifier`]. Failures are logged and dropped. Nothing here can fail an
//! order.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use shopfront_events::{Event, EventBus, InMemoryEventBus};
use shopfront_sales::OrderEvent;

pub type OrderEventBus = InMemoryEventBus<OrderEvent>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError>;
}

/// Writes the would-be email to the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError> {
        let (subject, body) = render(event);
        info!(
            event_type = event.event_type(),
            order_id = %event.order_id(),
            user_id = %event.user_id(),
            occurred_at = %event.occurred_at(),
            subject = %subject,
            body = %body,
            "notification"
        );
        Ok(())
    }
}

fn render(event: &OrderEvent) -> (String, String) {
    match event {
        OrderEvent::OrderPlaced { order_id, total_amount, .. } => (
            format!("Order confirmation #{order_id}"),
            format!("Thanks for your order. Total: {total_amount} USD."),
        ),
        OrderEvent::OrderStatusChanged { order_id, to, .. } => (
            format!("Order #{order_id} update"),
            format!("Your order is now {to}."),
        ),
        OrderEvent::OrderCancelled { order_id, .. } => (
            format!("Order #{order_id} cancelled"),
            "Your order was cancelled and any reserved items were returned to stock.".to_string(),
        ),
        OrderEvent::PaymentCompleted { order_id, amount, .. } => (
            format!("Payment received for order #{order_id}"),
            format!("We received your payment of {amount} USD."),
        ),
    }
}

/// Publish after commit. A failed publish is logged, never returned.
pub fn publish(bus: &OrderEventBus, event: OrderEvent) {
    let event_type = event.event_type();
    if let Err(e) = bus.publish(event) {
        warn!(event_type, error = %e, "failed to publish order event");
    }
}

/// Drain the bus on a blocking thread until every publisher is gone.
pub fn spawn_notification_worker(bus: &OrderEventBus, notifier: Arc<dyn Notifier>) -> JoinHandle<()> {
    let sub = bus.subscribe();
    tokio::task::spawn_blocking(move || {
        loop {
            match sub.recv() {
                Ok(event) => {
                    if let Err(e) = notifier.notify(&event) {
                        warn!(
                            event_type = event.event_type(),
                            order_id = %event.order_id(),
                            error = %e,
                            "notification failed"
                        );
                    }
                }
                Err(_) => break,
            }
        }
    })
}
