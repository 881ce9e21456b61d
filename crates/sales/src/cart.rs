use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use shopfront_catalog::Product;
use shopfront_core::{DomainError, DomainResult, ProductId, UserId};

/// A user's cart: at most one line per product.
///
/// Lines are kept ordered by product id so consumers that lock products per
/// line always lock in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: UserId,
    lines: BTreeMap<ProductId, u32>,
}

impl Cart {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: BTreeMap::new(),
        }
    }

    pub fn restore(user_id: UserId, lines: impl IntoIterator<Item = (ProductId, u32)>) -> Self {
        Self {
            user_id,
            lines: lines.into_iter().filter(|(_, q)| *q > 0).collect(),
        }
    }

    /// `(product, quantity)` pairs in ascending product id order.
    pub fn lines(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.lines.iter().map(|(id, q)| (*id, *q))
    }

    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.lines.get(&product_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_items(&self) -> u32 {
        self.lines.values().sum()
    }

    /// Add `quantity` of `product`, merging with an existing line.
    pub fn add(&mut self, product: &Product, quantity: u32) -> DomainResult<u32> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if !product.in_stock() {
            return Err(DomainError::unavailable(&product.name));
        }
        let resulting = self
            .quantity_of(product.id)
            .unwrap_or(0)
            .saturating_add(quantity);
        if resulting > product.stock_count() {
            return Err(DomainError::insufficient_stock(&product.name));
        }
        self.lines.insert(product.id, resulting);
        Ok(resulting)
    }

    /// Set the quantity of an existing line. Zero or less removes it.
    pub fn update(&mut self, product: &Product, quantity: i64) -> DomainResult<()> {
        if !self.lines.contains_key(&product.id) {
            return Err(DomainError::not_found("cart item"));
        }
        if quantity <= 0 {
            self.lines.remove(&product.id);
            return Ok(());
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| DomainError::validation("quantity is too large"))?;
        if quantity > product.stock_count() {
            return Err(DomainError::insufficient_stock(&product.name));
        }
        self.lines.insert(product.id, quantity);
        Ok(())
    }

    /// Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        self.lines.remove(&product_id).is_some()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
