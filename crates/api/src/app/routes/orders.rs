use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};

use shopfront_auth::Actor;
use shopfront_core::Page;
use shopfront_infra::views::OrderView;

use crate::app::dto::{self, CreateOrderRequest, PageQuery};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderView>)> {
    let order = services.orders.create_order(&actor, &body.shipping_address).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<OrderView>>> {
    Ok(Json(services.orders.list_orders(&actor, page.to_request()).await?))
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderView>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.orders.get_order(&actor, id).await?))
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderView>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.orders.cancel_order(&actor, id).await?))
}
