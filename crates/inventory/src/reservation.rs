use serde::{Deserialize, Serialize};

use shopfront_core::{OrderId, ProductId};

/// Stock debited for one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    released: bool,
}

impl Reservation {
    pub(crate) fn new(order_id: OrderId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            order_id,
            product_id,
            quantity,
            released: false,
        }
    }

    /// Rebuild a reservation loaded from storage.
    pub fn restore(order_id: OrderId, product_id: ProductId, quantity: u32, released: bool) -> Self {
        Self {
            order_id,
            product_id,
            quantity,
            released,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn mark_released(&mut self) {
        self.released = true;
    }
}
