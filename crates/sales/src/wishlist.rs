use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use shopfront_core::{DomainError, DomainResult, ProductId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub user_id: UserId,
    products: BTreeSet<ProductId>,
}

impl Wishlist {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            products: BTreeSet::new(),
        }
    }

    pub fn restore(user_id: UserId, products: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            user_id,
            products: products.into_iter().collect(),
        }
    }

    pub fn products(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.products.iter().copied()
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.contains(&product_id)
    }

    pub fn add(&mut self, product_id: ProductId) -> DomainResult<()> {
        if !self.products.insert(product_id) {
            return Err(DomainError::conflict("product already in wishlist"));
        }
        Ok(())
    }

    /// Removing an absent product is a no-op.
    pub fn remove(&mut self, product_id: ProductId) {
        self.products.remove(&product_id);
    }

    pub fn clear(&mut self) {
        self.products.clear();
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
