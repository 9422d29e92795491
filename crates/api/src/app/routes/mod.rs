use axum::{Router, routing::get};

pub mod admin;
pub mod authz;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/authz", authz::router())
        .nest("/admin", admin::router())
}
