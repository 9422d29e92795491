use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use gatehouse_auth::{AdminError, AuthzError};

/// "Could not decide" is a server fault, never a deny.
pub fn authz_error_to_response(err: AuthzError) -> Response {
    tracing::warn!(error = %err, "authorization check failed");
    let code = match err {
        AuthzError::GrantStoreUnavailable(_) => "grant_store_unavailable",
        AuthzError::Cancelled => "cancelled",
        AuthzError::OwnerResolution(_) => "owner_resolution_failed",
    };
    json_error(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
}

pub fn admin_error_to_response(err: AdminError) -> Response {
    match err {
        AdminError::DuplicateAssignment => {
            json_error(StatusCode::CONFLICT, "duplicate_assignment", err.to_string())
        }
        AdminError::DuplicateName(_) => json_error(StatusCode::CONFLICT, "duplicate_name", err.to_string()),
        AdminError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        AdminError::Invalid(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
        AdminError::Unavailable(_) => {
            tracing::warn!(error = %err, "admin write failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_unavailable", err.to_string())
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
