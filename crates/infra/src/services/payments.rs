use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use shopfront_auth::{Actor, ensure_owner};
use shopfront_core::{DomainError, OrderId};
use shopfront_sales::{OrderEvent, Payment, PaymentIntent};

use crate::notify::{OrderEventBus, publish};
use crate::services::ServiceResult;
use crate::store::{Store, UnitOfWork};
use crate::views::PaymentStatusView;

/// Mock payment provider. Intents are stored locally and confirmed by id.
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
    bus: Arc<OrderEventBus>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn Store>, bus: Arc<OrderEventBus>) -> Self {
        Self { store, bus }
    }

    /// Open a pending intent for the order's total. Only the order's owner
    /// may pay for it.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn create_intent(&self, actor: &Actor, order_id: OrderId) -> ServiceResult<PaymentIntent> {
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
        ensure_owner(actor, order.user_id)?;
        order.ensure_payable()?;

        let now = Utc::now();
        let (payment, intent) = Payment::open(order.id, order.total_amount(), now);
        uow.save_payment(&payment).await?;
        order.attach_payment(&payment.intent_id, now);
        uow.save_order(&order).await?;
        uow.commit().await?;

        info!(intent_id = %intent.payment_intent_id, amount = %intent.amount, "payment intent created");
        Ok(intent)
    }

    /// Mark the intent and its order paid. Confirming a completed intent
    /// again returns the current state unchanged.
    #[instrument(skip(self), err)]
    pub async fn confirm(&self, intent_id: &str) -> ServiceResult<PaymentStatusView> {
        let mut uow = self.store.begin().await?;
        let mut payment = find_payment(uow.as_mut(), intent_id).await?;
        let mut order = uow.lock_order(payment.order_id).await?.ok_or_else(|| {
            DomainError::invariant(format!("payment {intent_id} points at missing order {}", payment.order_id))
        })?;

        if payment.is_completed() {
            return Ok(PaymentStatusView::new(&payment, order.status()));
        }

        let now = Utc::now();
        order.mark_paid(now)?;
        payment.complete();
        uow.save_payment(&payment).await?;
        uow.save_order(&order).await?;
        uow.commit().await?;

        info!(order_id = %order.id, status = %order.status(), "payment completed");
        publish(
            &self.bus,
            OrderEvent::PaymentCompleted {
                order_id: order.id,
                user_id: order.user_id,
                payment_intent_id: payment.intent_id.clone(),
                amount: payment.amount,
                occurred_at: now,
            },
        );
        Ok(PaymentStatusView::new(&payment, order.status()))
    }

    pub async fn status(&self, intent_id: &str) -> ServiceResult<PaymentStatusView> {
        let mut uow = self.store.begin().await?;
        let payment = find_payment(uow.as_mut(), intent_id).await?;
        let order = uow.get_order(payment.order_id).await?.ok_or_else(|| {
            DomainError::invariant(format!("payment {intent_id} points at missing order {}", payment.order_id))
        })?;
        Ok(PaymentStatusView::new(&payment, order.status()))
    }
}

async fn find_payment(uow: &mut dyn UnitOfWork, intent_id: &str) -> ServiceResult<Payment> {
    uow.get_payment_by_intent(intent_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("payment {intent_id}")).into())
}
