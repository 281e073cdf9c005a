use axum::{middleware::from_fn, Router};

use crate::middleware;

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod parcels;
pub mod payments;
pub mod products;
pub mod system;
pub mod upload;
pub mod users;
pub mod webhooks;

/// Everything served under `/api/v1`.
///
/// Catalog reads, auth, tracking and gateway callbacks are public. The
/// rest sits behind [`middleware::require_auth`].
pub fn router(upload_max_bytes: usize) -> Router {
    let protected = Router::new()
        .nest("/users", users::router())
        .nest("/addresses", addresses::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/admin", admin::router())
        .nest("/upload", upload::router(upload_max_bytes))
        .route_layer(from_fn(middleware::require_auth));

    Router::new()
        .nest("/auth", auth::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/parcels", parcels::router())
        .nest("/webhooks", webhooks::router())
        .merge(protected)
}
