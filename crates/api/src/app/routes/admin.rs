use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::Utc;

use shopfront_auth::{Actor, ProfileUpdate, Role, User};
use shopfront_core::Page;
use shopfront_infra::views::{Analytics, DashboardStats, OrderView};
use shopfront_sales::OrderStatus;

use crate::app::dto::{self, AnalyticsQuery, PageQuery, RoleQuery, StatusQuery};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/:id/status", patch(update_order_status))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/analytics", get(analytics))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/users/:id/role", patch(set_user_role))
        .route("/users/:id/toggle-enabled", patch(toggle_user_enabled))
}

pub async fn list_all_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<OrderView>>> {
    Ok(Json(services.orders.list_all_orders(&actor, page.to_request()).await?))
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<OrderView>> {
    let id = dto::parse_id(&id)?;
    let status: OrderStatus = query.status.parse()?;
    Ok(Json(services.orders.update_status(&actor, id, status).await?))
}

pub async fn dashboard_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(services.dashboard.stats(&actor, Utc::now()).await?))
}

pub async fn analytics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<Analytics>> {
    Ok(Json(services.dashboard.analytics(&actor, query.days, Utc::now()).await?))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<User>>> {
    Ok(Json(services.users.list(&actor, page.to_request()).await?))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.users.get_user(&actor, id).await?))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.users.update_user(&actor, id, update).await?))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = dto::parse_id(&id)?;
    services.users.delete_user(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_user_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Query(query): Query<RoleQuery>,
) -> ApiResult<Json<User>> {
    let id = dto::parse_id(&id)?;
    let role: Role = query.role.parse()?;
    Ok(Json(services.users.set_role(&actor, id, role).await?))
}

pub async fn toggle_user_enabled(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.users.toggle_enabled(&actor, id).await?))
}
