//! The resolved caller: who they are (if anyone) and what they're allowed
//! to do. Built once per request by the authn middleware and read by
//! handlers via the [`SecurityContext`] extractor.

use std::net::IpAddr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use cloudpam_core::error::Kind;
use cloudpam_core::model::{Action, ActorType, ApiKey, Resource, User};
use cloudpam_engine::ActorContext;

use crate::problem::Problem;

#[derive(Debug, Clone)]
pub enum Principal {
    Anonymous,
    User(User),
    ApiKey(ApiKey),
}

/// The authenticated-or-not caller, plus the request metadata every audit
/// event needs. Always present in request extensions once the authn
/// middleware has run — even for anonymous requests.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    pub principal: Principal,
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub request_id: String,
}

impl SecurityContext {
    #[must_use]
    pub fn anonymous(ip: Option<IpAddr>, user_agent: Option<String>, request_id: String) -> Self {
        Self { principal: Principal::Anonymous, ip, user_agent, request_id }
    }

    /// Fails 401 if no principal resolved, 403 if a resolved principal
    /// lacks the permission.
    pub fn require(&self, resource: Resource, action: Action) -> Result<(), Problem> {
        match &self.principal {
            Principal::Anonymous => Err(Problem::new(Kind::Unauthenticated, "authentication required")),
            Principal::User(user) => {
                if !user.active {
                    return Err(Problem::new(Kind::Forbidden, "user account is deactivated"));
                }
                cloudpam_auth::require_permission(user.role, resource, action)
                    .map_err(|e| Problem::new(Kind::Forbidden, e.to_string()))
            }
            Principal::ApiKey(key) => {
                if cloudpam_auth::scopes_allow(&key.scopes, resource, action) {
                    Ok(())
                } else {
                    Err(Problem::new(Kind::Forbidden, format!("API key lacks scope {resource:?}:{action:?}")))
                }
            }
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        match &self.principal {
            Principal::User(user) => Some(user.id),
            _ => None,
        }
    }

    /// Builds the attribution context `cloudpam-engine` threads through
    /// every audited mutation.
    #[must_use]
    pub fn actor_context(&self) -> ActorContext {
        let (actor_type, actor_id, actor_label) = match &self.principal {
            Principal::Anonymous => (ActorType::Anonymous, None, None),
            Principal::User(user) => (ActorType::User, Some(user.id), Some(user.username.clone())),
            Principal::ApiKey(key) => (ActorType::ApiKey, Some(key.id), Some(key.name.clone())),
        };
        ActorContext {
            actor_type,
            actor_id,
            actor_label,
            ip: self.ip.map(|ip| ip.to_string()),
            user_agent: self.user_agent.clone(),
            request_id: Some(self.request_id.clone()),
        }
    }
}

impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .ok_or_else(|| Problem::new(Kind::Internal, "security context missing: authn middleware did not run"))
    }
}
