use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::{OrderId, UserId};
use shopfront_events::Event;

use crate::OrderStatus;

/// Committed order-workflow facts, fanned out to notification consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    OrderPlaced {
        order_id: OrderId,
        user_id: UserId,
        total_amount: Decimal,
        occurred_at: DateTime<Utc>,
    },
    OrderStatusChanged {
        order_id: OrderId,
        user_id: UserId,
        from: OrderStatus,
        to: OrderStatus,
        occurred_at: DateTime<Utc>,
    },
    OrderCancelled {
        order_id: OrderId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    PaymentCompleted {
        order_id: OrderId,
        user_id: UserId,
        payment_intent_id: String,
        amount: Decimal,
        occurred_at: DateTime<Utc>,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderPlaced { order_id, .. }
            | OrderEvent::OrderStatusChanged { order_id, .. }
            | OrderEvent::OrderCancelled { order_id, .. }
            | OrderEvent::PaymentCompleted { order_id, .. } => *order_id,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            OrderEvent::OrderPlaced { user_id, .. }
            | OrderEvent::OrderStatusChanged { user_id, .. }
            | OrderEvent::OrderCancelled { user_id, .. }
            | OrderEvent::PaymentCompleted { user_id, .. } => *user_id,
        }
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced { .. } => "sales.order.placed",
            OrderEvent::OrderStatusChanged { .. } => "sales.order.status_changed",
            OrderEvent::OrderCancelled { .. } => "sales.order.cancelled",
            OrderEvent::PaymentCompleted { .. } => "sales.payment.completed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced { occurred_at, .. }
            | OrderEvent::OrderStatusChanged { occurred_at, .. }
            | OrderEvent::OrderCancelled { occurred_at, .. }
            | OrderEvent::PaymentCompleted { occurred_at, .. } => *occurred_at,
        }
    }
}
