use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::instrument;

use shopfront_auth::{Actor, ensure_admin};
use shopfront_core::DomainError;
use shopfront_sales::OrderStatus;

use crate::services::ServiceResult;
use crate::store::{Store, UnitOfWork};
use crate::views::{Analytics, DashboardStats, StatusBreakdown};

pub const DEFAULT_ANALYTICS_DAYS: u32 = 30;
pub const MAX_ANALYTICS_DAYS: u32 = 365;
const TOP_PRODUCTS: u32 = 5;

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Store-wide totals. "Today" starts at UTC midnight; the week and month
    /// windows are the trailing 7 and 30 days.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn stats(&self, actor: &Actor, now: DateTime<Utc>) -> ServiceResult<DashboardStats> {
        ensure_admin(actor)?;

        let today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now);
        let week = now - Duration::days(7);
        let month = now - Duration::days(30);

        let mut uow = self.store.begin().await?;
        Ok(DashboardStats {
            total_users: uow.count_users().await?,
            total_orders: uow.count_orders_since(None).await?,
            total_products: uow.count_products().await?,
            total_revenue: uow.revenue_since(None).await?,
            orders_today: uow.count_orders_since(Some(today)).await?,
            orders_this_week: uow.count_orders_since(Some(week)).await?,
            orders_this_month: uow.count_orders_since(Some(month)).await?,
            revenue_today: uow.revenue_since(Some(today)).await?,
            revenue_this_week: uow.revenue_since(Some(week)).await?,
            revenue_this_month: uow.revenue_since(Some(month)).await?,
            pending_orders: uow.count_orders_with_status(OrderStatus::Pending).await?,
            confirmed_orders: uow.count_orders_with_status(OrderStatus::Confirmed).await?,
            shipped_orders: uow.count_orders_with_status(OrderStatus::Shipped).await?,
            delivered_orders: uow.count_orders_with_status(OrderStatus::Delivered).await?,
            cancelled_orders: uow.count_orders_with_status(OrderStatus::Cancelled).await?,
        })
    }

    /// Per-day orders, category sales and best sellers over the trailing
    /// `days`, plus the all-time status breakdown. Revenue here counts every
    /// order placed, paid or not.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn analytics(&self, actor: &Actor, days: Option<u32>, now: DateTime<Utc>) -> ServiceResult<Analytics> {
        ensure_admin(actor)?;
        let days = days.unwrap_or(DEFAULT_ANALYTICS_DAYS);
        if !(1..=MAX_ANALYTICS_DAYS).contains(&days) {
            return Err(DomainError::validation(format!("days must be between 1 and {MAX_ANALYTICS_DAYS}")).into());
        }
        let since = now - Duration::days(i64::from(days));

        let mut uow = self.store.begin().await?;
        Ok(Analytics {
            days,
            daily_stats: uow.daily_order_stats(since).await?,
            category_sales: uow.sales_by_category(since).await?,
            top_products: uow.top_products(since, TOP_PRODUCTS).await?,
            order_status_breakdown: status_breakdown(uow.as_mut()).await?,
        })
    }
}

async fn status_breakdown(uow: &mut dyn UnitOfWork) -> ServiceResult<StatusBreakdown> {
    Ok(StatusBreakdown {
        pending: uow.count_orders_with_status(OrderStatus::Pending).await?,
        confirmed: uow.count_orders_with_status(OrderStatus::Confirmed).await?,
        shipped: uow.count_orders_with_status(OrderStatus::Shipped).await?,
        delivered: uow.count_orders_with_status(OrderStatus::Delivered).await?,
        cancelled: uow.count_orders_with_status(OrderStatus::Cancelled).await?,
    })
}
