//! Admin CRUD over roles, abilities, permissions, and assignments.
//!
//! Every route here sits behind `require_manage_grants`.

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};

use gatehouse_auth::{GrantAdmin, NewAbility, NewAssignment, NewPermission, NewRole};
use gatehouse_core::{AbilityId, AssignmentId, PermissionId, RoleId};

use crate::app::errors::admin_error_to_response;
use crate::authz::require_manage_grants;
use crate::context::AppStore;

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:id", put(update_role).delete(delete_role))
        .route("/abilities", get(list_abilities).post(create_ability))
        .route("/abilities/:id", put(update_ability).delete(delete_ability))
        .route("/permissions", post(grant))
        .route("/permissions/:id", delete(revoke))
        .route("/assignments", post(assign))
        .route("/assignments/:id", delete(unassign))
        .route_layer(axum::middleware::from_fn(require_manage_grants))
}

fn created<T: serde::Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

/// GET /admin/roles
pub async fn list_roles(Extension(store): Extension<AppStore>) -> Response {
    match store.list_roles().await {
        Ok(roles) => Json(serde_json::json!({ "roles": roles })).into_response(),
        Err(e) => admin_error_to_response(e),
    }
}

/// POST /admin/roles
pub async fn create_role(Extension(store): Extension<AppStore>, Json(body): Json<NewRole>) -> Response {
    match store.create_role(body).await {
        Ok(role) => created(role),
        Err(e) => admin_error_to_response(e),
    }
}

/// PUT /admin/roles/:id
pub async fn update_role(
    Extension(store): Extension<AppStore>,
    Path(id): Path<i64>,
    Json(body): Json<NewRole>,
) -> Response {
    match store.update_role(RoleId::new(id), body).await {
        Ok(role) => Json(role).into_response(),
        Err(e) => admin_error_to_response(e),
    }
}

/// DELETE /admin/roles/:id
pub async fn delete_role(Extension(store): Extension<AppStore>, Path(id): Path<i64>) -> Response {
    match store.delete_role(RoleId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => admin_error_to_response(e),
    }
}

/// GET /admin/abilities
pub async fn list_abilities(Extension(store): Extension<AppStore>) -> Response {
    match store.list_abilities().await {
        Ok(abilities) => Json(serde_json::json!({ "abilities": abilities })).into_response(),
        Err(e) => admin_error_to_response(e),
    }
}

/// POST /admin/abilities
pub async fn create_ability(
    Extension(store): Extension<AppStore>,
    Json(body): Json<NewAbility>,
) -> Response {
    match store.create_ability(body).await {
        Ok(ability) => created(ability),
        Err(e) => admin_error_to_response(e),
    }
}

/// PUT /admin/abilities/:id
pub async fn update_ability(
    Extension(store): Extension<AppStore>,
    Path(id): Path<i64>,
    Json(body): Json<NewAbility>,
) -> Response {
    match store.update_ability(AbilityId::new(id), body).await {
        Ok(ability) => Json(ability).into_response(),
        Err(e) => admin_error_to_response(e),
    }
}

/// DELETE /admin/abilities/:id
pub async fn delete_ability(Extension(store): Extension<AppStore>, Path(id): Path<i64>) -> Response {
    match store.delete_ability(AbilityId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => admin_error_to_response(e),
    }
}

/// POST /admin/permissions (grant or forbid, per `forbidden`)
pub async fn grant(
    Extension(store): Extension<AppStore>,
    Json(body): Json<NewPermission>,
) -> Response {
    match store.grant(body).await {
        Ok(permission) => created(permission),
        Err(e) => admin_error_to_response(e),
    }
}

/// DELETE /admin/permissions/:id
pub async fn revoke(Extension(store): Extension<AppStore>, Path(id): Path<i64>) -> Response {
    match store.revoke(PermissionId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => admin_error_to_response(e),
    }
}

/// POST /admin/assignments
pub async fn assign(
    Extension(store): Extension<AppStore>,
    Json(body): Json<NewAssignment>,
) -> Response {
    match store.assign(body).await {
        Ok(assignment) => created(assignment),
        Err(e) => admin_error_to_response(e),
    }
}

/// DELETE /admin/assignments/:id
pub async fn unassign(Extension(store): Extension<AppStore>, Path(id): Path<i64>) -> Response {
    match store.unassign(AssignmentId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => admin_error_to_response(e),
    }
}
