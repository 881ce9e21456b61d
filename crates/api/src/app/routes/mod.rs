use axum::{Router, routing::get};

pub mod admin;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod system;
pub mod users;
pub mod wishlist;

/// Router for every authenticated endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/cart", cart::router())
        .nest("/wishlist", wishlist::router())
        .nest("/reviews", reviews::router())
        .nest("/users", users::router())
        .nest("/admin", admin::router())
}
