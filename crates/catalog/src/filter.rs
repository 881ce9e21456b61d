//! Product search filters and ordering.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::{CategoryId, DomainError};

use crate::Product;

/// Search criteria. Every set field must match (AND).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    /// Case-insensitive category name.
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    pub is_new: Option<bool>,
}

impl ProductFilter {
    /// `category_name` is the name of the product's category, if any.
    pub fn matches(&self, product: &Product, category_name: Option<&str>) -> bool {
        if let Some(needle) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            if !product.name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(id) = self.category_id {
            if product.category_id != Some(id) {
                return false;
            }
        }
        if let Some(wanted) = self.category.as_deref() {
            match category_name {
                Some(actual) if actual.eq_ignore_ascii_case(wanted) => {}
                _ => return false,
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self.in_stock.is_some_and(|v| product.in_stock() != v) {
            return false;
        }
        if self.featured.is_some_and(|v| product.featured != v) {
            return false;
        }
        if self.is_new.is_some_and(|v| product.is_new != v) {
            return false;
        }
        true
    }
}

/// Result ordering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self {
            ProductSort::Newest => b.created_at.cmp(&a.created_at),
            ProductSort::PriceAsc => a.price.cmp(&b.price),
            ProductSort::PriceDesc => b.price.cmp(&a.price),
            ProductSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    pub fn sort(&self, products: &mut [Product]) {
        products.sort_by(|a, b| self.compare(a, b));
    }

    /// SQL `ORDER BY` clause for this ordering.
    pub fn order_by(&self) -> &'static str {
        match self {
            ProductSort::Newest => "p.created_at DESC, p.id",
            ProductSort::PriceAsc => "p.price ASC, p.id",
            ProductSort::PriceDesc => "p.price DESC, p.id",
            ProductSort::Name => "LOWER(p.name) ASC, p.id",
        }
    }
}

impl FromStr for ProductSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "newest" => Ok(ProductSort::Newest),
            "price_asc" => Ok(ProductSort::PriceAsc),
            "price_desc" => Ok(ProductSort::PriceDesc),
            "name" => Ok(ProductSort::Name),
            other => Err(DomainError::validation(format!("unknown sort '{other}'"))),
        }
    }
}
