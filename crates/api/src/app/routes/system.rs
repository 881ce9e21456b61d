use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode};
use serde_json::{Value, json};

use shopfront_auth::Actor;

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Value>> {
    let profile = services.users.get(actor.user_id).await?;
    Ok(Json(json!({
        "userId": actor.user_id.to_string(),
        "role": actor.role.as_str(),
        "profile": profile,
    })))
}
