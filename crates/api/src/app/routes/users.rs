use std::sync::Arc;

use axum::{Json, Router, extract::Extension, routing::get};

use shopfront_auth::{Actor, ProfileUpdate, User};

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/me", get(me).put(update_me))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<User>> {
    Ok(Json(services.users.me(&actor).await?))
}

pub async fn update_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(services.users.update_me(&actor, update).await?))
}
