//! HTTP application wiring (axum router + service wiring).
//!
//! - `services.rs`: store selection and service construction
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: request bodies and query parsing
//! - `errors.rs`: error to JSON response mapping

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router. `/health` is public; everything under `/api`
/// needs a bearer token.
pub fn build_app(services: Arc<AppServices>, jwt_secret: &str) -> Router {
    let jwt = Arc::new(shopfront_auth::Hs256JwtValidator::new(jwt_secret.as_bytes().to_vec()));
    let auth_state = middleware::AuthState {
        jwt,
        services: services.clone(),
    };

    // Outermost first.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware))
            .layer(Extension(services)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", protected)
}
