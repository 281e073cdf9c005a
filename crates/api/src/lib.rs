//! HTTP API for the storefront: routing, auth middleware and workflows.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;

pub use app::build_app;
pub use app::services::{AppServices, Settings};
