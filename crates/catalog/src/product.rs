use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::{CategoryId, DomainError, DomainResult, Entity, ProductId};

/// A sellable catalog item.
///
/// `stock_count` and `in_stock` are private: the only way to change them is
/// [`Product::set_stock_count`], which keeps `in_stock == (stock_count > 0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    stock_count: u32,
    in_stock: bool,
    pub featured: bool,
    pub is_new: bool,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub stock_count: u32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub stock_count: Option<u32>,
    pub featured: Option<bool>,
    pub is_new: Option<bool>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category_id: Option<CategoryId>,
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("product name is required"));
    }
    Ok(())
}

/// Prices are stored as `NUMERIC(12, 2)`.
pub const PRICE_SCALE: u32 = 2;

/// Stock is stored as a signed 32-bit integer.
pub const MAX_STOCK_COUNT: u32 = i32::MAX as u32;

/// Largest price a product may carry: 9 999 999 999.99.
pub fn max_price() -> Decimal {
    Decimal::new(999_999_999_999, PRICE_SCALE)
}

fn validate_amount(field: &str, amount: Decimal) -> DomainResult<()> {
    if amount > max_price() {
        return Err(DomainError::validation(format!("{field} must not exceed {}", max_price())));
    }
    if amount.normalize().scale() > PRICE_SCALE {
        return Err(DomainError::validation(format!(
            "{field} must have at most {PRICE_SCALE} decimal places"
        )));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> DomainResult<()> {
    if price <= Decimal::ZERO {
        return Err(DomainError::validation("price must be greater than 0"));
    }
    validate_amount("price", price)
}

fn validate_original_price(original: Option<Decimal>) -> DomainResult<()> {
    match original {
        Some(p) if p < Decimal::ZERO => {
            Err(DomainError::validation("original price cannot be negative"))
        }
        Some(p) => validate_amount("original price", p),
        None => Ok(()),
    }
}

fn validate_stock_count(count: u32) -> DomainResult<()> {
    if count > MAX_STOCK_COUNT {
        return Err(DomainError::validation(format!("stock count must not exceed {MAX_STOCK_COUNT}")));
    }
    Ok(())
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_original_price(self.original_price)?;
        validate_stock_count(self.stock_count)
    }
}

impl Product {
    pub fn create(id: ProductId, input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        let mut product = Self {
            id,
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            original_price: input.original_price,
            stock_count: 0,
            in_stock: false,
            featured: input.featured,
            is_new: input.is_new,
            image: input.image,
            tags: input.tags,
            category_id: input.category_id,
            created_at: now,
        };
        product.set_stock_count(input.stock_count);
        Ok(product)
    }

    /// Rebuild a product loaded from storage. `in_stock` is recomputed from
    /// the stored count.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: ProductId,
        name: String,
        description: Option<String>,
        price: Decimal,
        original_price: Option<Decimal>,
        stock_count: u32,
        featured: bool,
        is_new: bool,
        image: Option<String>,
        tags: Vec<String>,
        category_id: Option<CategoryId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            price,
            original_price,
            stock_count,
            in_stock: stock_count > 0,
            featured,
            is_new,
            image,
            tags,
            category_id,
            created_at,
        }
    }

    pub fn stock_count(&self) -> u32 {
        self.stock_count
    }

    pub fn in_stock(&self) -> bool {
        self.in_stock
    }

    pub fn set_stock_count(&mut self, count: u32) {
        self.stock_count = count;
        self.in_stock = count > 0;
    }

    /// Apply a partial update. Validation happens before any field changes.
    pub fn apply_patch(&mut self, patch: ProductPatch) -> DomainResult<()> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
        }
        validate_original_price(patch.original_price)?;
        if let Some(count) = patch.stock_count {
            validate_stock_count(count)?;
        }

        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(original) = patch.original_price {
            self.original_price = Some(original);
        }
        if let Some(count) = patch.stock_count {
            self.set_stock_count(count);
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
        if let Some(is_new) = patch.is_new {
            self.is_new = is_new;
        }
        if let Some(image) = patch.image {
            self.image = Some(image);
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = Some(category_id);
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
