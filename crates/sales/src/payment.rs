//! Mock payment intents. No provider is contacted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopfront_core::OrderId;

use crate::PaymentStatus;

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Card,
    Paypal,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::Paypal => "PAYPAL",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
        }
    }
}

impl core::str::FromStr for PaymentMethod {
    type Err = shopfront_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CARD" => Ok(PaymentMethod::Card),
            "PAYPAL" => Ok(PaymentMethod::Paypal),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            other => Err(shopfront_core::DomainError::validation(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

/// Stored payment record, one per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub intent_id: String,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// What the client receives when opening an intent. The secret is not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub payment_intent_id: String,
    pub client_secret: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
}

impl Payment {
    /// Open a pending intent for `amount`. Returns the record and the
    /// client-facing intent.
    pub fn open(order_id: OrderId, amount: Decimal, now: DateTime<Utc>) -> (Self, PaymentIntent) {
        let intent_id = format!("pi_{}", Uuid::new_v4().simple());
        let client_secret = format!("cs_{}", Uuid::new_v4().simple());

        let payment = Self {
            intent_id: intent_id.clone(),
            order_id,
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            method: PaymentMethod::default(),
            status: PaymentStatus::Pending,
            created_at: now,
        };
        let intent = PaymentIntent {
            payment_intent_id: intent_id,
            client_secret,
            amount,
            currency: payment.currency.clone(),
            status: PaymentStatus::Pending,
        };
        (payment, intent)
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    pub fn complete(&mut self) {
        self.status = PaymentStatus::Completed;
    }
}
