use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cloudpam_core::model::{ActorType, AuditAction, AuditEvent};

#[derive(Debug, Clone, Serialize)]
pub struct AuditEventResponse {
    pub id: Uuid,
    pub actor_type: ActorType,
    pub actor_id: Option<Uuid>,
    pub actor_label: Option<String>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub ip: Option<String>,
    pub request_id: Option<String>,
    pub metadata: HashMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl From<AuditEvent> for AuditEventResponse {
    fn from(e: AuditEvent) -> Self {
        Self {
            id: e.id,
            actor_type: e.actor_type,
            actor_id: e.actor_id,
            actor_label: e.actor_label,
            action: e.action,
            resource_type: e.resource_type,
            resource_id: e.resource_id,
            before: e.before,
            after: e.after,
            ip: e.ip,
            request_id: e.request_id,
            metadata: e.metadata,
            occurred_at: e.occurred_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuditListQuery {
    pub action: Option<AuditAction>,
    pub resource_type: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
