//! Bulk pool creation from a topologically-ordered plan: a pre-check mode
//! that reports conflicts without writing, and an apply mode that either
//! creates every row or none, unless the caller opts into partial success.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use uuid::Uuid;

use cloudpam_cidr::Cidr;
use cloudpam_core::model::{AuditAction, NewPool, Pool, PoolSource, PoolStatus, PoolType};
use cloudpam_store::{AccountFilter, PageRequest, PoolFilter, Store, StoreError, StoreResult};

use cloudpam_audit::AuditSink;

use crate::context::ActorContext;

/// One row of an unresolved schema plan, keyed by a caller-supplied
/// temporary id so a batch can describe a multi-level hierarchy before
/// any of it has real pool ids.
#[derive(Debug, Clone)]
pub struct SchemaPlanItem {
    pub temp_id: String,
    pub name: String,
    pub cidr: String,
    pub pool_type: PoolType,
    pub parent_temp_id: Option<String>,
    pub account_key: Option<String>,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct SchemaPlanRowOutcome {
    pub temp_id: String,
    pub pool: Option<Pool>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaPlanResult {
    pub rows: Vec<SchemaPlanRowOutcome>,
}

impl SchemaPlanResult {
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.rows.iter().all(|r| r.error.is_none())
    }
}

/// A pool in the overlap/containment check — either a real `Store` row or
/// a plan row tentatively accepted during pre-check, distinguished by a
/// synthetic negative id so the two never collide.
struct PlanPool {
    id: i64,
    cidr: Cidr,
    parent_id: Option<i64>,
}

fn is_ancestor(all: &[PlanPool], a: i64, b: i64) -> bool {
    let mut cur = all.iter().find(|p| p.id == b).and_then(|p| p.parent_id);
    while let Some(id) = cur {
        if id == a {
            return true;
        }
        cur = all.iter().find(|p| p.id == id).and_then(|p| p.parent_id);
    }
    false
}

fn conflicting_pool(all: &[PlanPool], cidr: &Cidr, parent_id: Option<i64>) -> Option<i64> {
    all.iter().find_map(|other| {
        if !cloudpam_cidr::overlaps(&other.cidr, cidr) {
            return None;
        }
        let allowed = parent_id.is_some_and(|pid| other.id == pid || is_ancestor(all, other.id, pid));
        if allowed { None } else { Some(other.id) }
    })
}

/// Orders plan rows so parents precede children; rejects an unknown
/// `parentTempId` or a cycle among them.
fn topological_order(items: &[SchemaPlanItem]) -> Result<Vec<usize>, String> {
    let index_of: HashMap<&str, usize> = items.iter().enumerate().map(|(i, it)| (it.temp_id.as_str(), i)).collect();
    let mut indegree = vec![0usize; items.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); items.len()];

    for (i, item) in items.iter().enumerate() {
        if let Some(parent_temp) = &item.parent_temp_id {
            let &parent_idx = index_of
                .get(parent_temp.as_str())
                .ok_or_else(|| format!("unknown parentTempId `{parent_temp}` referenced by `{}`", item.temp_id))?;
            children[parent_idx].push(i);
            indegree[i] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..items.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(items.len());
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &child in &children[i] {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    if order.len() != items.len() {
        return Err("schema plan contains a parentTempId cycle".into());
    }
    Ok(order)
}

pub struct SchemaPlanService {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
}

impl SchemaPlanService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    async fn resolve_account(&self, org_id: Uuid, key: &str) -> StoreResult<i64> {
        let page = self
            .store
            .list_accounts(org_id, &AccountFilter::default(), PageRequest { page: 1, page_size: 10_000 })
            .await?;
        page.items
            .into_iter()
            .find(|a| a.key == key)
            .map(|a| a.id)
            .ok_or_else(|| StoreError::Validation(format!("unknown account key `{key}`")))
    }

    /// Validates the plan against current `Store` state without writing
    /// anything. Output rows are in input order, not topological order.
    pub async fn precheck(&self, org_id: Uuid, items: &[SchemaPlanItem]) -> StoreResult<SchemaPlanResult> {
        let existing = self.store.list_pools(org_id, &PoolFilter::default(), PageRequest { page: 1, page_size: 10_000 }).await?;
        let mut all: Vec<PlanPool> = existing
            .items
            .iter()
            .map(|p| PlanPool { id: p.id, cidr: p.cidr, parent_id: p.parent_id })
            .collect();

        let order = match topological_order(items) {
            Ok(o) => o,
            Err(msg) => {
                return Ok(SchemaPlanResult {
                    rows: items
                        .iter()
                        .map(|it| SchemaPlanRowOutcome { temp_id: it.temp_id.clone(), pool: None, error: Some(msg.clone()) })
                        .collect(),
                });
            }
        };

        let mut temp_to_id: HashMap<String, i64> = HashMap::new();
        let mut next_synthetic: i64 = -1;
        let mut rows: Vec<Option<SchemaPlanRowOutcome>> = vec![None; items.len()];

        for idx in order {
            let item = &items[idx];
            rows[idx] = Some(self.check_row(org_id, &mut all, &mut temp_to_id, &mut next_synthetic, item).await);
        }

        Ok(SchemaPlanResult { rows: rows.into_iter().map(|r| r.expect("every row visited")).collect() })
    }

    async fn check_row(
        &self,
        org_id: Uuid,
        all: &mut Vec<PlanPool>,
        temp_to_id: &mut HashMap<String, i64>,
        next_synthetic: &mut i64,
        item: &SchemaPlanItem,
    ) -> SchemaPlanRowOutcome {
        let fail = |error: String| SchemaPlanRowOutcome { temp_id: item.temp_id.clone(), pool: None, error: Some(error) };

        let cidr = match cloudpam_core::validation::validate_pool_cidr(&item.cidr) {
            Ok(c) => c,
            Err(e) => return fail(e.to_string()),
        };

        let parent_id = match &item.parent_temp_id {
            None => None,
            Some(parent_temp) => match temp_to_id.get(parent_temp) {
                Some(&id) => Some(id),
                None => return fail(format!("parent `{parent_temp}` was not created")),
            },
        };

        if let Some(parent_id) = parent_id {
            if let Some(parent) = all.iter().find(|p| p.id == parent_id) {
                if !cloudpam_cidr::contains(&parent.cidr, &cidr) {
                    return fail(format!("{cidr} is not contained within its parent"));
                }
            }
        }

        if let Some(conflict_id) = conflicting_pool(all, &cidr, parent_id) {
            return fail(format!("{cidr} overlaps existing pool {conflict_id}"));
        }

        if let Some(key) = &item.account_key {
            if let Err(e) = self.resolve_account(org_id, key).await {
                return fail(e.to_string());
            }
        }

        let synthetic_id = *next_synthetic;
        *next_synthetic -= 1;
        temp_to_id.insert(item.temp_id.clone(), synthetic_id);
        all.push(PlanPool { id: synthetic_id, cidr, parent_id });

        SchemaPlanRowOutcome { temp_id: item.temp_id.clone(), pool: None, error: None }
    }

    /// Applies the plan. With `skip_conflicts = false`, any row failing at
    /// write time rolls back every row created earlier in this call
    /// (children first) and returns the triggering error, leaving the
    /// `Store` unchanged. With `skip_conflicts = true`, a failing row and
    /// everything depending on it are skipped, and every other row is
    /// still created.
    pub async fn apply(&self, ctx: &ActorContext, org_id: Uuid, items: Vec<SchemaPlanItem>, skip_conflicts: bool) -> StoreResult<SchemaPlanResult> {
        let plan = self.precheck(org_id, &items).await?;
        if !skip_conflicts && !plan.all_ok() {
            return Ok(plan);
        }

        let order = topological_order(&items).expect("already validated by precheck");
        let mut temp_to_real: HashMap<String, i64> = HashMap::new();
        let mut skipped: HashSet<String> = HashSet::new();
        let mut created: Vec<i64> = Vec::new();
        let mut rows: Vec<Option<SchemaPlanRowOutcome>> = vec![None; items.len()];

        for idx in order {
            let item = &items[idx];

            if let Some(error) = plan.rows[idx].error.clone() {
                rows[idx] = Some(SchemaPlanRowOutcome { temp_id: item.temp_id.clone(), pool: None, error: Some(error) });
                skipped.insert(item.temp_id.clone());
                continue;
            }
            if item.parent_temp_id.as_ref().is_some_and(|p| skipped.contains(p)) {
                rows[idx] = Some(SchemaPlanRowOutcome {
                    temp_id: item.temp_id.clone(),
                    pool: None,
                    error: Some("skipped: parent row failed".into()),
                });
                skipped.insert(item.temp_id.clone());
                continue;
            }

            let parent_id = item.parent_temp_id.as_ref().and_then(|p| temp_to_real.get(p).copied());
            let account_id = match &item.account_key {
                Some(key) => match self.resolve_account(org_id, key).await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        rows[idx] = Some(SchemaPlanRowOutcome { temp_id: item.temp_id.clone(), pool: None, error: Some(e.to_string()) });
                        skipped.insert(item.temp_id.clone());
                        continue;
                    }
                },
                None => None,
            };

            let new = NewPool {
                org_id,
                name: item.name.clone(),
                cidr: item.cidr.clone(),
                parent_id,
                account_id,
                pool_type: item.pool_type,
                status: PoolStatus::Planned,
                source: PoolSource::Manual,
                description: None,
                tags: item.tags.clone(),
            };

            match self.store.create_pool(new).await {
                Ok(pool) => {
                    temp_to_real.insert(item.temp_id.clone(), pool.id);
                    created.push(pool.id);
                    self.audit
                        .record(ctx.event(org_id, AuditAction::Create, "pool", pool.id.to_string(), None, serde_json::to_value(&pool).ok()))
                        .await;
                    rows[idx] = Some(SchemaPlanRowOutcome { temp_id: item.temp_id.clone(), pool: Some(pool), error: None });
                }
                Err(e) => {
                    if !skip_conflicts {
                        for id in created.into_iter().rev() {
                            let _ = self.store.delete_pool(org_id, id).await;
                        }
                        return Err(e);
                    }
                    rows[idx] = Some(SchemaPlanRowOutcome { temp_id: item.temp_id.clone(), pool: None, error: Some(e.to_string()) });
                    skipped.insert(item.temp_id.clone());
                }
            }
        }

        Ok(SchemaPlanResult { rows: rows.into_iter().map(|r| r.expect("every row visited")).collect() })
    }
}
