//! Gap analysis and fragmentation scoring over a pool's live direct
//! children. Pure computation — no `Store` writes, only the read side.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cloudpam_cidr::Cidr;
use cloudpam_core::model::Pool;
use cloudpam_store::{Store, StoreResult};

/// One contiguous run of free addresses directly under a pool, not
/// covered by any live direct child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeInterval {
    pub start: u32,
    pub end: u32,
    pub size: u64,
    /// The largest CIDR-aligned block starting at `start` that fits
    /// within this interval.
    pub largest_aligned_block: Cidr,
}

fn largest_aligned_block(start: u32, end: u32) -> Cidr {
    let range_size = u64::from(end) - u64::from(start) + 1;
    let mut best_bits = 32u8;
    for bits in (0..32).rev() {
        let block_size = 1u64 << (32 - bits);
        if block_size > range_size || u64::from(start) % block_size != 0 {
            continue;
        }
        best_bits = bits;
        break;
    }
    Cidr::new_unchecked(start, best_bits)
}

fn make_interval(start: u32, end: u32) -> FreeInterval {
    FreeInterval {
        start,
        end,
        size: u64::from(end) - u64::from(start) + 1,
        largest_aligned_block: largest_aligned_block(start, end),
    }
}

/// The ordered list of free address ranges within `parent` not covered by
/// `children`, which must already be the parent's live direct children.
#[must_use]
pub fn gap_analysis(parent: &Pool, children: &[Pool]) -> Vec<FreeInterval> {
    let mut sorted: Vec<&Pool> = children.iter().collect();
    sorted.sort_by_key(|c| c.cidr.base());

    let parent_start = parent.cidr.base();
    let parent_end = parent.cidr.last_address();

    let mut gaps = Vec::new();
    let mut cursor = parent_start;

    for child in sorted {
        let child_start = child.cidr.base();
        if child_start > cursor {
            gaps.push(make_interval(cursor, child_start - 1));
        }
        let child_end = child.cidr.last_address();
        if child_end >= cursor {
            cursor = child_end.saturating_add(1);
        }
        if cursor == 0 && child_end == u32::MAX {
            // the child covers through the top of the address space
            return gaps;
        }
    }
    if cursor <= parent_end {
        gaps.push(make_interval(cursor, parent_end));
    }
    gaps
}

/// `100 * (1 - largest_free_block / total_free)`, `0` when there is no
/// free space. Higher means more fragmented.
#[must_use]
pub fn fragmentation_score(gaps: &[FreeInterval]) -> f64 {
    let total_free: u64 = gaps.iter().map(|g| g.size).sum();
    if total_free == 0 {
        return 0.0;
    }
    let largest_free = gaps.iter().map(|g| g.size).max().unwrap_or(0);
    100.0 * (1.0 - (largest_free as f64 / total_free as f64))
}

pub struct AnalysisService {
    store: Arc<dyn Store>,
}

impl AnalysisService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn gap_analysis(&self, org_id: Uuid, pool_id: i64) -> StoreResult<Vec<FreeInterval>> {
        let parent = self.store.get_pool(org_id, pool_id).await?;
        let children = self.store.list_children(org_id, pool_id).await?;
        Ok(gap_analysis(&parent, &children))
    }

    pub async fn fragmentation_score(&self, org_id: Uuid, pool_id: i64) -> StoreResult<f64> {
        let gaps = self.gap_analysis(org_id, pool_id).await?;
        Ok(fragmentation_score(&gaps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpam_core::model::{PoolSource, PoolStatus, PoolType};

    fn pool(id: i64, cidr: &str, parent_id: Option<i64>) -> Pool {
        Pool {
            id,
            org_id: Uuid::nil(),
            name: format!("p{id}"),
            cidr: Cidr::parse(cidr, false).unwrap(),
            parent_id,
            account_id: None,
            pool_type: PoolType::Subnet,
            status: PoolStatus::Active,
            source: PoolSource::Manual,
            description: None,
            tags: Default::default(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn single_gap_in_the_middle() {
        let parent = pool(1, "10.0.0.0/24", None);
        let children = vec![pool(2, "10.0.0.0/26", Some(1)), pool(3, "10.0.0.192/26", Some(1))];
        let gaps = gap_analysis(&parent, &children);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].size, 128);
    }

    #[test]
    fn no_children_means_one_gap_covering_the_whole_pool() {
        let parent = pool(1, "10.0.0.0/24", None);
        let gaps = gap_analysis(&parent, &[]);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].size, 256);
        assert_eq!(gaps[0].largest_aligned_block.to_string(), "10.0.0.0/24");
    }

    #[test]
    fn fully_covered_pool_has_no_gaps_and_zero_fragmentation() {
        let parent = pool(1, "10.0.0.0/24", None);
        let children = vec![pool(2, "10.0.0.0/24", Some(1))];
        let gaps = gap_analysis(&parent, &children);
        assert!(gaps.is_empty());
        assert_eq!(fragmentation_score(&gaps), 0.0);
    }

    #[test]
    fn fragmentation_score_reflects_split_free_space() {
        let parent = pool(1, "10.0.0.0/24", None);
        // one /26 child in the middle leaves two free /26-sized gaps either side
        let children = vec![pool(2, "10.0.0.64/26", Some(1))];
        let gaps = gap_analysis(&parent, &children);
        assert_eq!(gaps.len(), 2);
        assert_eq!(fragmentation_score(&gaps), 50.0);
    }
}
