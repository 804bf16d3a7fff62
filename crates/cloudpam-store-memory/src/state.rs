use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cloudpam_core::model::{
    Account, ApiKey, AuditEvent, BootstrapToken, DiscoveredResource, DiscoveryAgent,
    Pool, Recommendation, Session, SyncJob, User,
};

/// All state lives behind one `parking_lot::RwLock<Inner>` in `MemoryStore`.
/// Methods here are plain synchronous functions; the `Store` trait impl in
/// `lib.rs` is the only place that takes the lock.
#[derive(Default)]
pub(crate) struct Inner {
    pub pools: HashMap<i64, Pool>,
    pub next_pool_id: i64,
    pub accounts: HashMap<i64, Account>,
    pub next_account_id: i64,
    pub resources: HashMap<Uuid, DiscoveredResource>,
    pub agents: HashMap<Uuid, DiscoveryAgent>,
    pub sync_jobs: HashMap<Uuid, SyncJob>,
    pub bootstrap_tokens: HashMap<Uuid, BootstrapToken>,
    pub audit: Vec<AuditEvent>,
    pub users: HashMap<Uuid, User>,
    pub sessions: HashMap<String, Session>,
    pub api_keys: HashMap<Uuid, ApiKey>,
    pub recommendations: HashMap<Uuid, Recommendation>,
}

impl Inner {
    pub(crate) fn next_pool_id(&mut self) -> i64 {
        self.next_pool_id += 1;
        self.next_pool_id
    }

    pub(crate) fn next_account_id(&mut self) -> i64 {
        self.next_account_id += 1;
        self.next_account_id
    }

    pub(crate) fn live_pools(&self, org_id: Uuid) -> impl Iterator<Item = &Pool> {
        self.pools
            .values()
            .filter(move |p| p.org_id == org_id && p.is_live())
    }

    /// True if `a` is an ancestor of `b` (strict, any depth).
    pub(crate) fn is_ancestor(&self, a: i64, b: i64) -> bool {
        let mut cur = self.pools.get(&b).and_then(|p| p.parent_id);
        while let Some(id) = cur {
            if id == a {
                return true;
            }
            cur = self.pools.get(&id).and_then(|p| p.parent_id);
        }
        false
    }

    pub(crate) fn is_ancestor_or_descendant(&self, a: i64, b: i64) -> bool {
        self.is_ancestor(a, b) || self.is_ancestor(b, a)
    }

    pub(crate) fn has_live_children(&self, org_id: Uuid, parent_id: i64) -> bool {
        self.live_pools(org_id).any(|p| p.parent_id == Some(parent_id))
    }

    pub(crate) fn live_children(&self, org_id: Uuid, parent_id: i64) -> Vec<Pool> {
        let mut v: Vec<Pool> = self
            .live_pools(org_id)
            .filter(|p| p.parent_id == Some(parent_id))
            .cloned()
            .collect();
        v.sort_by_key(|p| p.id);
        v
    }

    pub(crate) fn subtree_ids(&self, org_id: Uuid, root: i64) -> Vec<i64> {
        let mut out = vec![root];
        let mut frontier = vec![root];
        while let Some(id) = frontier.pop() {
            for child in self.live_children(org_id, id) {
                out.push(child.id);
                frontier.push(child.id);
            }
        }
        out
    }

    pub(crate) fn now() -> DateTime<Utc> {
        Utc::now()
    }
}
