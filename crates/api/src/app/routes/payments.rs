use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use shopfront_auth::Actor;
use shopfront_infra::views::PaymentStatusView;
use shopfront_sales::PaymentIntent;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/create-intent/:order_id", post(create_intent))
        .route("/confirm/:intent_id", post(confirm_payment))
        .route("/status/:intent_id", get(payment_status))
}

pub async fn create_intent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<PaymentIntent>> {
    let order_id = dto::parse_id(&order_id)?;
    Ok(Json(services.payments.create_intent(&actor, order_id).await?))
}

pub async fn confirm_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(intent_id): Path<String>,
) -> ApiResult<Json<PaymentStatusView>> {
    Ok(Json(services.payments.confirm(&intent_id).await?))
}

pub async fn payment_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(intent_id): Path<String>,
) -> ApiResult<Json<PaymentStatusView>> {
    Ok(Json(services.payments.status(&intent_id).await?))
}
