//! Pool hierarchy orchestration: create/delete policy atop the [`Store`],
//! stats rollup, and block enumeration for a parent pool.

use std::sync::Arc;

use uuid::Uuid;

use cloudpam_core::model::{AuditAction, Block, NewPool, Pool, PoolNode, PoolStats, PoolUpdate};
use cloudpam_store::{Page, PageRequest, PoolFilter, Store, StoreError, StoreResult};

use cloudpam_audit::AuditSink;

use crate::context::ActorContext;

pub struct HierarchyService {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
}

impl HierarchyService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    pub async fn list_pools(&self, org_id: Uuid, filter: &PoolFilter, page: PageRequest) -> StoreResult<Page<Pool>> {
        self.store.list_pools(org_id, filter, page).await
    }

    pub async fn get_pool(&self, org_id: Uuid, id: i64) -> StoreResult<Pool> {
        self.store.get_pool(org_id, id).await
    }

    pub async fn list_children(&self, org_id: Uuid, parent_id: i64) -> StoreResult<Vec<Pool>> {
        self.store.list_children(org_id, parent_id).await
    }

    pub async fn hierarchy(&self, org_id: Uuid, root: Option<i64>) -> StoreResult<Vec<PoolNode>> {
        self.store.hierarchy(org_id, root).await
    }

    pub async fn get_pool_with_stats(&self, org_id: Uuid, id: i64) -> StoreResult<(Pool, PoolStats)> {
        self.store.get_pool_with_stats(org_id, id).await
    }

    /// Creates a pool and records the creation event. Validation,
    /// containment, and overlap checks happen inside the `Store`; a race
    /// between concurrent creators of the same CIDR surfaces here as
    /// `Conflict`.
    pub async fn create_pool(&self, ctx: &ActorContext, new: NewPool) -> StoreResult<Pool> {
        let org_id = new.org_id;
        let pool = self.store.create_pool(new).await?;
        self.audit
            .record(ctx.event(
                org_id,
                AuditAction::Create,
                "pool",
                pool.id.to_string(),
                None,
                serde_json::to_value(&pool).ok(),
            ))
            .await;
        Ok(pool)
    }

    pub async fn update_pool(&self, ctx: &ActorContext, org_id: Uuid, id: i64, update: PoolUpdate) -> StoreResult<Pool> {
        let before = self.store.get_pool(org_id, id).await?;
        let after = self.store.update_pool(org_id, id, update).await?;
        self.audit
            .record(ctx.event(
                org_id,
                AuditAction::Update,
                "pool",
                id.to_string(),
                serde_json::to_value(&before).ok(),
                serde_json::to_value(&after).ok(),
            ))
            .await;
        Ok(after)
    }

    /// Refuses with `Conflict` if the pool has live children.
    pub async fn delete_pool(&self, ctx: &ActorContext, org_id: Uuid, id: i64) -> StoreResult<()> {
        let before = self.store.get_pool(org_id, id).await?;
        self.store.delete_pool(org_id, id).await?;
        self.audit
            .record(ctx.event(org_id, AuditAction::Delete, "pool", id.to_string(), serde_json::to_value(&before).ok(), None))
            .await;
        Ok(())
    }

    /// Soft-deletes the pool and its entire live subtree.
    pub async fn cascade_delete_pool(&self, ctx: &ActorContext, org_id: Uuid, id: i64) -> StoreResult<Vec<i64>> {
        let before = self.store.get_pool(org_id, id).await?;
        let deleted_ids = self.store.cascade_delete_pool(org_id, id).await?;
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("deleted_ids".to_string(), format!("{deleted_ids:?}"));
        let mut event = ctx.event(org_id, AuditAction::Delete, "pool", id.to_string(), serde_json::to_value(&before).ok(), None);
        event.metadata = metadata;
        self.audit.record(event).await;
        Ok(deleted_ids)
    }

    /// Returns one page of candidate child prefixes of `new_prefix_len`
    /// under `pool_id`, each marked with the live direct child it
    /// collides with, if any.
    pub async fn enumerate_blocks(
        &self,
        org_id: Uuid,
        pool_id: i64,
        new_prefix_len: u8,
        page: u32,
        page_size: u32,
    ) -> StoreResult<(Vec<Block>, u64)> {
        let parent = self.store.get_pool(org_id, pool_id).await?;
        if new_prefix_len <= parent.cidr.prefix_len() || new_prefix_len > 32 {
            return Err(StoreError::Validation(format!(
                "prefix length must be greater than {} and at most 32",
                parent.cidr.prefix_len()
            )));
        }
        let children = self.store.list_children(org_id, pool_id).await?;
        let (candidates, total) = cloudpam_cidr::enumerate(&parent.cidr, new_prefix_len, page, page_size);
        let blocks = candidates
            .into_iter()
            .map(|cidr| {
                let assigned_pool_id = children.iter().find(|c| cloudpam_cidr::overlaps(&c.cidr, &cidr)).map(|c| c.id);
                Block { cidr, assigned_pool_id }
            })
            .collect();
        Ok((blocks, total))
    }
}
