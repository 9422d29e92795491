//! HTTP application wiring (Axum router + shared state).
//!
//! - `routes/`: handlers, one file per area
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::context::{AppAuthorizer, AppStore};
use crate::middleware;
use crate::token::Hs256Validator;

pub mod errors;
pub mod routes;

/// Build the full HTTP router over `store`.
///
/// The same store backs both the decision path and the admin writes.
pub fn build_app(config: &ApiConfig, store: AppStore) -> Router {
    let tokens = Arc::new(Hs256Validator::new(config.jwt_secret.as_bytes()));
    let authorizer = Arc::new(AppAuthorizer::new(Arc::clone(&store)));
    let auth_state = middleware::AuthState { tokens, authorizer };

    let protected = routes::router()
        .layer(Extension(store))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_id_middleware)))
}
