use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::Instrument;

use crate::app::errors::json_error;
use crate::context::{AppAuthorizer, RequestId, SubjectContext};
use crate::token::TokenValidator;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenValidator>,
    pub authorizer: Arc<AppAuthorizer>,
}

/// Authenticate the bearer token and attach the subject plus a fresh
/// request-scoped authorizer to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "missing bearer token"))?;

    let claims = state.tokens.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string())
    })?;

    let subject = SubjectContext::from_claims(&claims);
    tracing::Span::current().record("subject", tracing::field::display(subject.subject()));

    req.extensions_mut().insert(subject);
    req.extensions_mut().insert(state.authorizer.request_scope());

    Ok(next.run(req).await)
}

/// Wrap the request in a span carrying a v7 request id; echo it back.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = RequestId::new();
    let span = tracing::info_span!(
        "request",
        request_id = %id.0,
        method = %req.method(),
        path = %req.uri().path(),
        subject = tracing::field::Empty,
    );
    req.extensions_mut().insert(id);

    let mut res = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id.0.to_string()) {
        res.headers_mut().insert("x-request-id", value);
    }
    res
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
