//! Audit event capture, decoupled from any one transport.
//!
//! Mutating operations in `cloudpam-engine` and `cloudpam-auth` call
//! [`AuditSink::record`] with typed before/after domain values — never
//! the raw HTTP request body, which is the redesign this crate exists to
//! carry out. Failures never block the business transaction: the
//! `Store`-backed sink logs and drops them rather than propagating.

use std::sync::Arc;

use async_trait::async_trait;
use cloudpam_core::model::NewAuditEvent;
use cloudpam_store::Store;

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records one audit event. Never returns an error: a sink whose
    /// underlying write can fail must log and swallow it internally.
    async fn record(&self, event: NewAuditEvent);
}

/// Writes audit events through a [`Store`]. Failures are logged at `warn`
/// and dropped, per the "audit writes never block" contract.
pub struct StoreAuditSink<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> StoreAuditSink<S> {
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store + ?Sized> AuditSink for StoreAuditSink<S> {
    async fn record(&self, event: NewAuditEvent) {
        let resource_type = event.resource_type.clone();
        let resource_id = event.resource_id.clone();
        if let Err(e) = self.store.append_audit(event).await {
            tracing::warn!(
                error = %e,
                resource_type = %resource_type,
                resource_id = %resource_id,
                "failed to record audit event"
            );
        }
    }
}

/// Drops every event. Used in tests and tools that have no use for the
/// audit trail.
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn record(&self, _event: NewAuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpam_core::model::{ActorType, AuditAction, DEFAULT_ORG_ID};
    use cloudpam_store_memory::MemoryStore;
    use cloudpam_store::AuditFilter;

    fn event() -> NewAuditEvent {
        NewAuditEvent {
            org_id: DEFAULT_ORG_ID,
            actor_type: ActorType::User,
            actor_id: None,
            actor_label: Some("tester".into()),
            action: AuditAction::Create,
            resource_type: "pool".into(),
            resource_id: "1".into(),
            before: None,
            after: None,
            ip: None,
            user_agent: None,
            request_id: None,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn store_sink_persists_event() {
        let store = Arc::new(MemoryStore::new());
        let sink = StoreAuditSink::new(store.clone());
        sink.record(event()).await;

        let page = store
            .list_audit(DEFAULT_ORG_ID, &AuditFilter::default(), Default::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].resource_type, "pool");
    }

    #[tokio::test]
    async fn null_sink_drops_event() {
        let sink = NullAuditSink;
        sink.record(event()).await;
    }
}
