use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

use shopfront_auth::Actor;
use shopfront_infra::views::WishlistView;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_wishlist).delete(clear_wishlist))
        .route("/check/:product_id", get(check_product))
        .route("/:product_id", post(add_product).delete(remove_product))
}

pub async fn get_wishlist(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<WishlistView>> {
    Ok(Json(services.wishlist.get(&actor).await?))
}

pub async fn add_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
) -> ApiResult<StatusCode> {
    let product_id = dto::parse_id(&product_id)?;
    services.wishlist.add(&actor, product_id).await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
) -> ApiResult<StatusCode> {
    let product_id = dto::parse_id(&product_id)?;
    services.wishlist.remove(&actor, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let product_id = dto::parse_id(&product_id)?;
    let present = services.wishlist.contains(&actor, product_id).await?;
    Ok(Json(json!({ "inWishlist": present })))
}

pub async fn clear_wishlist(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<StatusCode> {
    services.wishlist.clear(&actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
