use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post, put},
};

use shopfront_auth::Actor;
use shopfront_infra::views::CartView;

use crate::app::dto::{self, AddCartItemRequest, QuantityQuery};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", put(update_item).delete(remove_item))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<CartView>> {
    Ok(Json(services.cart.get_cart(&actor).await?))
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<AddCartItemRequest>,
) -> ApiResult<Json<CartView>> {
    let product_id = dto::parse_id(&body.product_id)?;
    let quantity = body.quantity.unwrap_or(1);
    Ok(Json(services.cart.add_item(&actor, product_id, quantity).await?))
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
    Query(query): Query<QuantityQuery>,
) -> ApiResult<Json<CartView>> {
    let product_id = dto::parse_id(&product_id)?;
    Ok(Json(services.cart.update_item(&actor, product_id, query.quantity).await?))
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<CartView>> {
    let product_id = dto::parse_id(&product_id)?;
    Ok(Json(services.cart.remove_item(&actor, product_id).await?))
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<StatusCode> {
    services.cart.clear(&actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
