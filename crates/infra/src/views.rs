//! Flattened read projections returned by the services.
//!
//! Entities reference each other by id; these views join the bits a client
//! needs (category name, rating, user email) so no entity graph leaves the
//! store.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_catalog::{Product, Review, average_rating};
use shopfront_core::{CategoryId, DomainResult, OrderId, ProductId, ReviewId, UserId};
use shopfront_sales::{Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus, sum_amounts};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub stock_count: u32,
    pub in_stock: bool,
    pub featured: bool,
    pub is_new: bool,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub category: Option<String>,
    pub rating: f64,
    pub reviews: u64,
    pub created_at: DateTime<Utc>,
}

impl ProductView {
    pub fn new(product: &Product, category: Option<String>, ratings: &[u8]) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            original_price: product.original_price,
            stock_count: product.stock_count(),
            in_stock: product.in_stock(),
            featured: product.featured,
            is_new: product.is_new,
            image: product.image.clone(),
            tags: product.tags.clone(),
            category_id: product.category_id,
            category,
            rating: average_rating(ratings),
            reviews: ratings.len() as u64,
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
    pub subtotal: Decimal,
    pub in_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_items: u32,
    pub total_amount: Decimal,
}

impl CartView {
    pub fn new(items: Vec<CartLineView>) -> DomainResult<Self> {
        let total_items = items.iter().map(|l| l.quantity).fold(0u32, u32::saturating_add);
        let total_amount = sum_amounts(items.iter().map(|l| l.subtotal))?;
        Ok(Self {
            items,
            total_items,
            total_amount,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistView {
    pub items: Vec<ProductView>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_email: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub payment_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    pub fn new(order: &Order, user_email: Option<String>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            user_email,
            items: order.items().to_vec(),
            total_amount: order.total_amount(),
            status: order.status(),
            shipping_address: order.shipping_address.clone(),
            payment_id: order.payment_id.clone(),
            payment_status: order.payment_status(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub payment_intent_id: String,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub order_status: OrderStatus,
}

impl PaymentStatusView {
    pub fn new(payment: &Payment, order_status: OrderStatus) -> Self {
        Self {
            payment_intent_id: payment.intent_id.clone(),
            order_id: payment.order_id,
            amount: payment.amount,
            currency: payment.currency.clone(),
            method: payment.method,
            status: payment.status,
            order_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReviewView {
    pub fn new(review: &Review, user_name: Option<String>) -> Self {
        Self {
            id: review.id,
            product_id: review.product_id,
            user_id: review.user_id,
            user_name,
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: review.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_orders: u64,
    pub total_products: u64,
    pub total_revenue: Decimal,
    pub orders_today: u64,
    pub orders_this_week: u64,
    pub orders_this_month: u64,
    pub revenue_today: Decimal,
    pub revenue_this_week: Decimal,
    pub revenue_this_month: Decimal,
    pub pending_orders: u64,
    pub confirmed_orders: u64,
    pub shipped_orders: u64,
    pub delivered_orders: u64,
    pub cancelled_orders: u64,
}

/// Orders placed on one UTC calendar day. Revenue is the sum of order totals
/// regardless of payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    pub orders: u64,
    pub revenue: Decimal,
}

/// Order lines and their value per category, highest revenue first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySales {
    pub category: String,
    pub orders: u64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub sold: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub pending: u64,
    pub confirmed: u64,
    pub shipped: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

/// Chart data for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub days: u32,
    pub daily_stats: Vec<DailyStats>,
    pub category_sales: Vec<CategorySales>,
    pub top_products: Vec<TopProduct>,
    pub order_status_breakdown: StatusBreakdown,
}
