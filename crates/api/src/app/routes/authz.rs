//! Decision and management-query endpoints.
//!
//! `can` and `explain` always evaluate for the authenticated subject.
//! `has-role` and `exists` may name another subject, which requires
//! `manage_grants`.

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use gatehouse_auth::{EntityRef, EvalContext};
use gatehouse_core::{AbilityId, ScopeId};

use crate::app::errors::{authz_error_to_response, json_error};
use crate::authz::{MANAGE_GRANTS, require_ability};
use crate::context::{AppRequestScope, SubjectContext};

#[derive(Debug, Deserialize)]
pub struct DecisionQuery {
    pub ability: String,
    /// `Kind:id`
    pub target: Option<String>,
    pub owner: Option<i64>,
    /// Overrides the session scope.
    pub scope: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HasRoleQuery {
    pub role: String,
    /// Defaults to the caller.
    pub subject: Option<String>,
    pub scope: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExistsQuery {
    pub ability_id: i64,
    pub target: String,
}

pub fn router() -> Router {
    Router::new()
        .route("/can", get(can))
        .route("/explain", get(explain))
        .route("/has-role", get(has_role))
        .route("/exists", get(exists))
}

/// GET /authz/can
pub async fn can(
    Extension(scope): Extension<AppRequestScope>,
    Extension(subject): Extension<SubjectContext>,
    Query(q): Query<DecisionQuery>,
) -> Response {
    let ctx = match eval_context(&subject, q) {
        Ok(ctx) => ctx,
        Err(res) => return res,
    };
    match scope.can(&ctx).await {
        Ok(allowed) => Json(serde_json::json!({ "allowed": allowed })).into_response(),
        Err(e) => authz_error_to_response(e),
    }
}

/// GET /authz/explain
pub async fn explain(
    Extension(scope): Extension<AppRequestScope>,
    Extension(subject): Extension<SubjectContext>,
    Query(q): Query<DecisionQuery>,
) -> Response {
    let ctx = match eval_context(&subject, q) {
        Ok(ctx) => ctx,
        Err(res) => return res,
    };
    match scope.explain(&ctx).await {
        Ok(explanation) => Json(explanation).into_response(),
        Err(e) => authz_error_to_response(e),
    }
}

/// GET /authz/has-role
pub async fn has_role(
    Extension(scope): Extension<AppRequestScope>,
    Extension(subject): Extension<SubjectContext>,
    Query(q): Query<HasRoleQuery>,
) -> Response {
    let who = match q.subject.as_deref().map(parse_ref).transpose() {
        Ok(who) => who.unwrap_or_else(|| subject.subject().clone()),
        Err(res) => return res,
    };
    if &who != subject.subject() {
        if let Err(res) = require_ability(&scope, &subject, MANAGE_GRANTS).await {
            return res;
        }
    }

    let in_scope = q.scope.map(ScopeId::new).or(subject.scope());
    match scope.authorizer().has_role(&who, &q.role, in_scope).await {
        Ok(has_role) => Json(serde_json::json!({ "has_role": has_role })).into_response(),
        Err(e) => authz_error_to_response(e),
    }
}

/// GET /authz/exists
pub async fn exists(
    Extension(scope): Extension<AppRequestScope>,
    Extension(subject): Extension<SubjectContext>,
    Query(q): Query<ExistsQuery>,
) -> Response {
    let target = match parse_ref(&q.target) {
        Ok(target) => target,
        Err(res) => return res,
    };
    if &target != subject.subject() {
        if let Err(res) = require_ability(&scope, &subject, MANAGE_GRANTS).await {
            return res;
        }
    }

    match scope.authorizer().exists(AbilityId::new(q.ability_id), &target).await {
        Ok(exists) => Json(serde_json::json!({ "exists": exists })).into_response(),
        Err(e) => authz_error_to_response(e),
    }
}

fn eval_context(subject: &SubjectContext, q: DecisionQuery) -> Result<EvalContext, Response> {
    let mut ctx = subject.eval(q.ability);
    if let Some(raw) = q.target.as_deref() {
        ctx = ctx.on(parse_ref(raw)?);
    }
    if let Some(owner) = q.owner {
        ctx = ctx.owned_by(owner);
    }
    if let Some(scope) = q.scope {
        ctx = ctx.in_scope(ScopeId::new(scope));
    }
    Ok(ctx)
}

fn parse_ref(raw: &str) -> Result<EntityRef, Response> {
    raw.parse()
        .map_err(|e: gatehouse_core::DomainError| json_error(StatusCode::BAD_REQUEST, "invalid_entity_ref", e.to_string()))
}
