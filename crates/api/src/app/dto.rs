//! Request bodies and query strings.
//!
//! Ids and decimals in paths and query strings arrive as text and are parsed
//! here so a malformed value becomes a `validation_error` response.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use shopfront_catalog::{ProductFilter, ProductSort};
use shopfront_core::page::DEFAULT_PAGE_SIZE;
use shopfront_core::{DomainError, PageRequest};

use crate::app::errors::ApiResult;

pub fn parse_id<T>(raw: &str) -> ApiResult<T>
where
    T: FromStr<Err = DomainError>,
{
    Ok(raw.trim().parse()?)
}

fn parse_decimal(field: &str, raw: Option<&str>) -> ApiResult<Option<Decimal>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Decimal::from_str(s)
            .map(Some)
            .map_err(|_| DomainError::validation(format!("{field} must be a decimal number")).into()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageQuery {
    pub fn to_request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(0), self.size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    pub is_new: Option<bool>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

impl ProductQuery {
    pub fn into_search(self) -> ApiResult<(ProductFilter, ProductSort, PageRequest)> {
        let page = PageQuery {
            page: self.page,
            size: self.size,
        }
        .to_request();
        let sort = match self.sort.as_deref() {
            Some(s) => s.parse::<ProductSort>()?,
            None => ProductSort::default(),
        };
        let category_id = match self.category_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_id(raw)?),
            None => None,
        };

        let filter = ProductFilter {
            name: self.name,
            category_id,
            category: self.category.filter(|c| !c.trim().is_empty()),
            min_price: parse_decimal("minPrice", self.min_price.as_deref())?,
            max_price: parse_decimal("maxPrice", self.max_price.as_deref())?,
            in_stock: self.in_stock,
            featured: self.featured,
            is_new: self.is_new,
        };
        Ok((filter, sort, page))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub product_id: String,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityQuery {
    pub quantity: i64,
}
