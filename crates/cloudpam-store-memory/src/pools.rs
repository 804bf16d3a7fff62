use uuid::Uuid;

use cloudpam_cidr::Cidr;
use cloudpam_core::model::{NewPool, Pool, PoolNode, PoolStats, PoolUpdate};
use cloudpam_store::{Page, PageRequest, PoolFilter, StoreError, StoreResult};

use crate::state::Inner;

impl Inner {
    pub(crate) fn list_pools(
        &self,
        org_id: Uuid,
        filter: &PoolFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Pool>> {
        let mut matched: Vec<&Pool> = self
            .pools
            .values()
            .filter(|p| p.org_id == org_id)
            .filter(|p| filter.include_deleted || p.is_live())
            .filter(|p| match &filter.parent_id {
                Some(Some(pid)) => p.parent_id == Some(*pid),
                Some(None) => p.parent_id.is_none(),
                None => true,
            })
            .filter(|p| filter.account_id.is_none_or(|a| p.account_id == Some(a)))
            .filter(|p| filter.pool_type.is_none_or(|t| p.pool_type == t))
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .filter(|p| filter.source.is_none_or(|s| p.source == s))
            .collect();
        matched.sort_by_key(|p| p.id);
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total, page.page, page.page_size))
    }

    pub(crate) fn get_pool(&self, org_id: Uuid, id: i64) -> StoreResult<Pool> {
        self.pools
            .get(&id)
            .filter(|p| p.org_id == org_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub(crate) fn create_pool(&mut self, new: NewPool) -> StoreResult<Pool> {
        let cidr: Cidr = cloudpam_core::validation::validate_pool_cidr(&new.cidr)
            .map_err(StoreError::from)?;

        if let Some(parent_id) = new.parent_id {
            let parent = self.get_pool(new.org_id, parent_id)?;
            if !cloudpam_cidr::contains(&parent.cidr, &cidr) {
                return Err(StoreError::Validation(format!(
                    "{cidr} is not contained within parent {}",
                    parent.cidr
                )));
            }
        }

        for other in self.live_pools(new.org_id) {
            if cloudpam_cidr::overlaps(&other.cidr, &cidr)
                && !self.is_ancestor_or_descendant_of_cidr(other.id, new.parent_id)
            {
                return Err(StoreError::Conflict(format!(
                    "{cidr} overlaps existing pool {} ({})",
                    other.id, other.cidr
                )));
            }
        }

        let id = self.next_pool_id();
        let now = Inner::now();
        let pool = Pool {
            id,
            org_id: new.org_id,
            name: new.name,
            cidr,
            parent_id: new.parent_id,
            account_id: new.account_id,
            pool_type: new.pool_type,
            status: new.status,
            source: new.source,
            description: new.description,
            tags: new.tags,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.pools.insert(id, pool.clone());
        Ok(pool)
    }

    /// An overlap is allowed only when the overlapping pool is the new
    /// pool's parent, or an ancestor of that parent.
    fn is_ancestor_or_descendant_of_cidr(&self, other_id: i64, parent_id: Option<i64>) -> bool {
        if let Some(parent_id) = parent_id {
            if other_id == parent_id {
                return true;
            }
            if self.is_ancestor(other_id, parent_id) {
                return true;
            }
        }
        false
    }

    pub(crate) fn update_pool(&mut self, org_id: Uuid, id: i64, update: PoolUpdate) -> StoreResult<Pool> {
        let mut pool = self.get_pool(org_id, id)?;
        if let Some(name) = update.name {
            pool.name = name;
        }
        if let Some(account_id) = update.account_id {
            pool.account_id = account_id;
        }
        if let Some(pool_type) = update.pool_type {
            pool.pool_type = pool_type;
        }
        if let Some(status) = update.status {
            pool.status = status;
        }
        if let Some(description) = update.description {
            pool.description = description;
        }
        if let Some(tags) = update.tags {
            pool.tags = tags;
        }
        pool.updated_at = Inner::now();
        self.pools.insert(id, pool.clone());
        Ok(pool)
    }

    pub(crate) fn delete_pool(&mut self, org_id: Uuid, id: i64) -> StoreResult<()> {
        self.get_pool(org_id, id)?;
        if self.has_live_children(org_id, id) {
            return Err(StoreError::Conflict("pool has live children".into()));
        }
        if let Some(pool) = self.pools.get_mut(&id) {
            pool.deleted_at = Some(Inner::now());
        }
        Ok(())
    }

    pub(crate) fn cascade_delete_pool(&mut self, org_id: Uuid, id: i64) -> StoreResult<Vec<i64>> {
        self.get_pool(org_id, id)?;
        let ids = self.subtree_ids(org_id, id);
        let now = Inner::now();
        for pid in &ids {
            if let Some(pool) = self.pools.get_mut(pid) {
                pool.deleted_at = Some(now);
            }
        }
        Ok(ids)
    }

    pub(crate) fn list_children(&self, org_id: Uuid, parent_id: i64) -> StoreResult<Vec<Pool>> {
        self.get_pool(org_id, parent_id)?;
        Ok(self.live_children(org_id, parent_id))
    }

    pub(crate) fn hierarchy(&self, org_id: Uuid, root: Option<i64>) -> StoreResult<Vec<PoolNode>> {
        if let Some(root) = root {
            let pool = self.get_pool(org_id, root)?;
            Ok(vec![self.build_node(org_id, pool)])
        } else {
            let mut roots: Vec<Pool> = self
                .live_pools(org_id)
                .filter(|p| p.parent_id.is_none())
                .cloned()
                .collect();
            roots.sort_by_key(|p| p.id);
            Ok(roots.into_iter().map(|p| self.build_node(org_id, p)).collect())
        }
    }

    fn build_node(&self, org_id: Uuid, pool: Pool) -> PoolNode {
        let children = self
            .live_children(org_id, pool.id)
            .into_iter()
            .map(|child| self.build_node(org_id, child))
            .collect();
        PoolNode { pool, children }
    }

    pub(crate) fn get_pool_with_stats(&self, org_id: Uuid, id: i64) -> StoreResult<(Pool, PoolStats)> {
        let pool = self.get_pool(org_id, id)?;
        let stats = self.compute_stats(org_id, &pool);
        Ok((pool, stats))
    }

    fn compute_stats(&self, org_id: Uuid, pool: &Pool) -> PoolStats {
        let children = self.live_children(org_id, pool.id);
        let total_ips = pool.cidr.host_count();
        let used_ips: u64 = children.iter().map(|c| c.cidr.host_count()).sum();
        let available_ips = total_ips.saturating_sub(used_ips);
        let utilization_pct = if total_ips == 0 {
            0.0
        } else {
            used_ips as f64 / total_ips as f64 * 100.0
        };
        let child_count = self.subtree_ids(org_id, pool.id).len() as u32 - 1;
        PoolStats {
            total_ips,
            used_ips,
            available_ips,
            utilization_pct,
            direct_children: children.len() as u32,
            child_count,
        }
    }

}
