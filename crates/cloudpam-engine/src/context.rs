use uuid::Uuid;

use cloudpam_core::model::{ActorType, AuditAction, NewAuditEvent};

/// Identifies who is calling the engine, for audit attribution. Built by
/// the authn middleware from the resolved principal (or left at its
/// anonymous default for unauthenticated paths) and threaded through
/// every mutating call.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub actor_type: ActorType,
    pub actor_id: Option<Uuid>,
    pub actor_label: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

impl Default for ActorContext {
    fn default() -> Self {
        Self {
            actor_type: ActorType::Anonymous,
            actor_id: None,
            actor_label: None,
            ip: None,
            user_agent: None,
            request_id: None,
        }
    }
}

impl ActorContext {
    #[must_use]
    pub fn system() -> Self {
        Self {
            actor_type: ActorType::Agent,
            actor_label: Some("system".into()),
            ..Default::default()
        }
    }

    pub(crate) fn event(
        &self,
        org_id: Uuid,
        action: AuditAction,
        resource_type: &str,
        resource_id: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> NewAuditEvent {
        NewAuditEvent {
            org_id,
            actor_type: self.actor_type,
            actor_id: self.actor_id,
            actor_label: self.actor_label.clone(),
            action,
            resource_type: resource_type.to_owned(),
            resource_id: resource_id.into(),
            before,
            after,
            ip: self.ip.clone(),
            user_agent: self.user_agent.clone(),
            request_id: self.request_id.clone(),
            metadata: std::collections::HashMap::new(),
        }
    }
}
