use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
};

use shopfront_auth::Actor;
use shopfront_catalog::{NewProduct, ProductPatch};
use shopfront_core::Page;
use shopfront_infra::views::ProductView;

use crate::app::dto::{self, ProductQuery};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(search_products).post(create_product))
        .route("/featured", get(featured_products))
        .route("/new", get(new_products))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub async fn search_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Page<ProductView>>> {
    let (filter, sort, page) = query.into_search()?;
    Ok(Json(services.catalog.search(&filter, sort, page).await?))
}

pub async fn featured_products(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Json<Vec<ProductView>>> {
    let products = services.catalog.featured_products().await?;
    Ok(Json(products.as_ref().clone()))
}

pub async fn new_products(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Json<Vec<ProductView>>> {
    let products = services.catalog.new_products().await?;
    Ok(Json(products.as_ref().clone()))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductView>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.catalog.get_product(id).await?))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<ProductView>)> {
    let product = services.catalog.create_product(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<ProductPatch>,
) -> ApiResult<Json<ProductView>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.catalog.update_product(&actor, id, body).await?))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = dto::parse_id(&id)?;
    services.catalog.delete_product(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
