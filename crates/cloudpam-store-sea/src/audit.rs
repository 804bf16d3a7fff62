use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use cloudpam_core::model::{AuditEvent, NewAuditEvent};
use cloudpam_store::{AuditFilter, Page, PageRequest, StoreError, StoreResult};

use crate::conv;
use crate::entities::audit_event::{self, Entity as AuditEntity};

pub(crate) async fn append_audit(db: &DatabaseConnection, event: NewAuditEvent) -> StoreResult<AuditEvent> {
    let record = AuditEvent {
        id: Uuid::new_v4(),
        org_id: event.org_id,
        actor_type: event.actor_type,
        actor_id: event.actor_id,
        actor_label: event.actor_label,
        action: event.action,
        resource_type: event.resource_type,
        resource_id: event.resource_id,
        before: event.before,
        after: event.after,
        ip: event.ip,
        user_agent: event.user_agent,
        request_id: event.request_id,
        metadata: event.metadata,
        occurred_at: chrono::Utc::now(),
    };
    let active = audit_event::ActiveModel {
        id: Set(record.id),
        org_id: Set(record.org_id),
        actor_type: Set(conv::actor_type_to_str(record.actor_type).to_owned()),
        actor_id: Set(record.actor_id),
        actor_label: Set(record.actor_label.clone()),
        action: Set(conv::audit_action_to_str(record.action).to_owned()),
        resource_type: Set(record.resource_type.clone()),
        resource_id: Set(record.resource_id.clone()),
        before: Set(record.before.clone()),
        after: Set(record.after.clone()),
        ip: Set(record.ip.clone()),
        user_agent: Set(record.user_agent.clone()),
        request_id: Set(record.request_id.clone()),
        metadata: Set(serde_json::to_value(&record.metadata).unwrap_or_default()),
        occurred_at: Set(record.occurred_at),
    };
    active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(record)
}

pub(crate) async fn list_audit(db: &DatabaseConnection, org_id: Uuid, filter: &AuditFilter, page: PageRequest) -> StoreResult<Page<AuditEvent>> {
    let rows = AuditEntity::find()
        .filter(audit_event::Column::OrgId.eq(org_id))
        .order_by(audit_event::Column::OccurredAt, Order::Desc)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let mut matched: Vec<AuditEvent> = rows.into_iter().map(conv::audit_event_from_model).collect::<StoreResult<Vec<_>>>()?;
    matched.retain(|e| filter.action.is_none_or(|a| e.action == a));
    matched.retain(|e| filter.resource_type.as_deref().is_none_or(|t| e.resource_type == t));
    matched.retain(|e| filter.actor_id.is_none_or(|a| e.actor_id == Some(a)));
    matched.retain(|e| filter.from.is_none_or(|f| e.occurred_at >= f));
    matched.retain(|e| filter.to.is_none_or(|t| e.occurred_at <= t));

    let total = matched.len() as u64;
    let items = matched.into_iter().skip(page.offset() as usize).take(page.page_size as usize).collect();
    Ok(Page::new(items, total, page.page, page.page_size))
}
