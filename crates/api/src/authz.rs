//! Ability guard for HTTP routes.
//!
//! Each check goes through the request's `RequestScope`, so a handler that
//! checks several abilities for the same subject loads its grants once.

use axum::{
    extract::{Extension, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::app::errors::{authz_error_to_response, json_error};
use crate::context::{AppRequestScope, SubjectContext};

pub const MANAGE_GRANTS: &str = "manage_grants";

/// `Ok(())` when the subject may `ability`; otherwise the response to send:
/// 403 on deny, 500 when the decision could not be made.
pub async fn require_ability(
    scope: &AppRequestScope,
    subject: &SubjectContext,
    ability: &str,
) -> Result<(), Response> {
    match scope.can(&subject.eval(ability)).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("{} may not {}", subject.subject(), ability),
        )),
        Err(e) => Err(authz_error_to_response(e)),
    }
}

/// Route layer guarding the admin surface.
pub async fn require_manage_grants(
    Extension(scope): Extension<AppRequestScope>,
    Extension(subject): Extension<SubjectContext>,
    req: Request,
    next: Next,
) -> Response {
    match require_ability(&scope, &subject, MANAGE_GRANTS).await {
        Ok(()) => next.run(req).await,
        Err(res) => res,
    }
}
