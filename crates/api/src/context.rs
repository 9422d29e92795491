use std::sync::Arc;

use gatehouse_auth::{Authorizer, EntityRef, EvalContext, RequestScope, SubjectClaims};
use gatehouse_core::ScopeId;
use gatehouse_infra::InMemoryGrantStore;

pub type AppStore = Arc<InMemoryGrantStore>;
pub type AppAuthorizer = Authorizer<AppStore>;
pub type AppRequestScope = RequestScope<AppStore>;

/// Authenticated subject for a request.
///
/// Immutable and present on every route behind the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectContext {
    subject: EntityRef,
    scope: Option<ScopeId>,
}

impl SubjectContext {
    pub fn new(subject: EntityRef, scope: Option<ScopeId>) -> Self {
        Self { subject, scope }
    }

    pub fn from_claims(claims: &SubjectClaims) -> Self {
        Self::new(claims.sub.clone(), claims.scope)
    }

    pub fn subject(&self) -> &EntityRef {
        &self.subject
    }

    /// Scope the session is bound to, if any.
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Evaluation context for `ability`, carrying the session scope.
    pub fn eval(&self, ability: impl Into<String>) -> EvalContext {
        let ctx = EvalContext::new(self.subject.clone(), ability);
        match self.scope {
            Some(scope) => ctx.in_scope(scope),
            None => ctx,
        }
    }
}

/// Request id attached to the request span and echoed in `x-request-id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub uuid::Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}
