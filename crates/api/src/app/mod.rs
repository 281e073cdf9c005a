//! HTTP application wiring (Axum router + shared services).
//!
//! - `services/`: business workflows over the store, gateway and storage
//! - `routes/`: HTTP handlers, one file per area of the storefront
//! - `dto.rs`: request/response bodies and their domain mapping
//! - `errors.rs`: the single error type and its JSON rendering

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{self, AuthState};

pub mod dto;
pub mod errors;
pub mod extract;
pub mod openapi;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: AppServices) -> Router {
    let auth_state = AuthState {
        jwt: services.jwt.clone(),
    };
    let upload_max_bytes = services.settings.upload_max_bytes;
    let services = Arc::new(services);

    let api = routes::router(upload_max_bytes).layer(from_fn_with_state(auth_state, middleware::authenticate));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/api/docs/openapi.json", get(routes::system::openapi))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(Extension(services)),
        )
}
