use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::SubjectContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(subject): Extension<SubjectContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "subject": subject.subject().to_string(),
        "scope": subject.scope(),
    }))
}
