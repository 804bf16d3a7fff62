use uuid::Uuid;

use cloudpam_core::model::{AuditEvent, NewAuditEvent};
use cloudpam_store::{AuditFilter, Page, PageRequest, StoreResult};

use crate::state::Inner;

impl Inner {
    pub(crate) fn append_audit(&mut self, event: NewAuditEvent) -> StoreResult<AuditEvent> {
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
            occurred_at: Inner::now(),
        };
        self.audit.push(record.clone());
        Ok(record)
    }

    pub(crate) fn list_audit(&self, org_id: Uuid, filter: &AuditFilter, page: PageRequest) -> StoreResult<Page<AuditEvent>> {
        let mut matched: Vec<&AuditEvent> = self
            .audit
            .iter()
            .filter(|e| e.org_id == org_id)
            .filter(|e| filter.action.is_none_or(|a| e.action == a))
            .filter(|e| filter.resource_type.as_deref().is_none_or(|t| e.resource_type == t))
            .filter(|e| filter.actor_id.is_none_or(|a| e.actor_id == Some(a)))
            .filter(|e| filter.from.is_none_or(|f| e.occurred_at >= f))
            .filter(|e| filter.to.is_none_or(|t| e.occurred_at <= t))
            .collect();
        matched.sort_by_key(|e| std::cmp::Reverse(e.occurred_at));
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total, page.page, page.page_size))
    }
}
