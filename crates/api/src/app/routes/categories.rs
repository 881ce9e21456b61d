use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};

use shopfront_auth::Actor;
use shopfront_catalog::{Category, CategoryInput};

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Json<Vec<Category>>> {
    let categories = services.catalog.list_categories().await?;
    Ok(Json(categories.as_ref().clone()))
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Category>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.catalog.get_category(id).await?))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = services.catalog.create_category(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<CategoryInput>,
) -> ApiResult<Json<Category>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.catalog.update_category(&actor, id, body).await?))
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = dto::parse_id(&id)?;
    services.catalog.delete_category(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
