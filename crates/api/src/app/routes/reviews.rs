use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post, put},
};

use shopfront_auth::Actor;
use shopfront_catalog::{NewReview, ReviewPatch};
use shopfront_core::Page;
use shopfront_infra::views::ReviewView;

use crate::app::dto::{self, PageQuery};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_review))
        .route("/product/:product_id", get(list_for_product))
        .route("/:id", put(update_review).delete(delete_review))
}

pub async fn list_for_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<ReviewView>>> {
    let product_id = dto::parse_id(&product_id)?;
    Ok(Json(services.reviews.list_for_product(product_id, page.to_request()).await?))
}

pub async fn create_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<NewReview>,
) -> ApiResult<(StatusCode, Json<ReviewView>)> {
    let review = services.reviews.create(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<ReviewPatch>,
) -> ApiResult<Json<ReviewView>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.reviews.update(&actor, id, body).await?))
}

pub async fn delete_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = dto::parse_id(&id)?;
    services.reviews.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
