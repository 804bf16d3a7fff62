use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use cloudpam_cidr::Cidr;
use cloudpam_core::model::{NewPool, Pool, PoolNode, PoolStats, PoolUpdate};
use cloudpam_store::{Page, PageRequest, PoolFilter, StoreError, StoreResult};

use crate::conv;
use crate::entities::pool::{self, Entity as PoolEntity};

async fn load_live(db: &impl ConnectionTrait, org_id: Uuid) -> StoreResult<Vec<Pool>> {
    let rows = PoolEntity::find()
        .filter(pool::Column::OrgId.eq(org_id))
        .filter(pool::Column::DeletedAt.is_null())
        .order_by_asc(pool::Column::Id)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    rows.into_iter().map(conv::pool_from_model).collect()
}

fn is_ancestor(all: &[Pool], a: i64, b: i64) -> bool {
    let mut cur = all.iter().find(|p| p.id == b).and_then(|p| p.parent_id);
    while let Some(id) = cur {
        if id == a {
            return true;
        }
        cur = all.iter().find(|p| p.id == id).and_then(|p| p.parent_id);
    }
    false
}

fn live_children(all: &[Pool], parent_id: i64) -> Vec<Pool> {
    let mut v: Vec<Pool> = all.iter().filter(|p| p.parent_id == Some(parent_id)).cloned().collect();
    v.sort_by_key(|p| p.id);
    v
}

fn is_ancestor_or_descendant_of_cidr(all: &[Pool], other_id: i64, parent_id: Option<i64>) -> bool {
    if let Some(parent_id) = parent_id {
        if other_id == parent_id {
            return true;
        }
        if is_ancestor(all, other_id, parent_id) {
            return true;
        }
    }
    false
}

/// `WITH RECURSIVE` walk down the live tree from `root`, returning `root`
/// itself plus every live descendant. Runs on both backends: SQLite and
/// Postgres both support recursive CTEs, so cascade deletes and subtree
/// counts never need to load an organization's whole pool table to find
/// one pool's descendants.
async fn subtree_ids_sql(db: &DatabaseConnection, org_id: Uuid, root: i64) -> StoreResult<Vec<i64>> {
    let backend = db.get_database_backend();
    let (sql, values) = match backend {
        DatabaseBackend::Postgres => (
            r#"WITH RECURSIVE subtree(id) AS (
                   SELECT id FROM pools WHERE id = $1 AND org_id = $2 AND deleted_at IS NULL
                   UNION ALL
                   SELECT p.id FROM pools p JOIN subtree s ON p.parent_id = s.id
                   WHERE p.org_id = $2 AND p.deleted_at IS NULL
               )
               SELECT id FROM subtree"#,
            vec![root.into(), org_id.into()],
        ),
        _ => (
            r#"WITH RECURSIVE subtree(id) AS (
                   SELECT id FROM pools WHERE id = ? AND org_id = ? AND deleted_at IS NULL
                   UNION ALL
                   SELECT p.id FROM pools p JOIN subtree s ON p.parent_id = s.id
                   WHERE p.org_id = ? AND p.deleted_at IS NULL
               )
               SELECT id FROM subtree"#,
            vec![root.into(), org_id.into(), org_id.into()],
        ),
    };
    let rows = db
        .query_all(Statement::from_sql_and_values(backend, sql, values))
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    rows.into_iter()
        .map(|row| row.try_get::<i64>("", "id").map_err(|e| StoreError::Internal(e.to_string())))
        .collect()
}

fn model_to_active(p: &Pool) -> pool::ActiveModel {
    pool::ActiveModel {
        id: Set(p.id),
        org_id: Set(p.org_id),
        name: Set(p.name.clone()),
        cidr: Set(p.cidr.to_string()),
        parent_id: Set(p.parent_id),
        account_id: Set(p.account_id),
        pool_type: Set(conv::pool_type_to_str(p.pool_type).to_owned()),
        status: Set(conv::pool_status_to_str(p.status).to_owned()),
        source: Set(conv::pool_source_to_str(p.source).to_owned()),
        description: Set(p.description.clone()),
        tags: Set(serde_json::to_value(&p.tags).unwrap_or_default()),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
        deleted_at: Set(p.deleted_at),
    }
}

pub(crate) async fn list_pools(db: &DatabaseConnection, org_id: Uuid, filter: &PoolFilter, page: PageRequest) -> StoreResult<Page<Pool>> {
    let mut matched: Vec<Pool> = if filter.include_deleted {
        let rows = PoolEntity::find()
            .filter(pool::Column::OrgId.eq(org_id))
            .order_by_asc(pool::Column::Id)
            .all(db)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(conv::pool_from_model).collect::<StoreResult<Vec<_>>>()?
    } else {
        load_live(db, org_id).await?
    };

    matched.retain(|p| match filter.parent_id {
        Some(Some(pid)) => p.parent_id == Some(pid),
        Some(None) => p.parent_id.is_none(),
        None => true,
    });
    matched.retain(|p| filter.account_id.is_none_or(|a| p.account_id == Some(a)));
    matched.retain(|p| filter.pool_type.is_none_or(|t| p.pool_type == t));
    matched.retain(|p| filter.status.is_none_or(|s| p.status == s));
    matched.retain(|p| filter.source.is_none_or(|s| p.source == s));

    let total = matched.len() as u64;
    let items = matched
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.page_size as usize)
        .collect();
    Ok(Page::new(items, total, page.page, page.page_size))
}

pub(crate) async fn get_pool(db: &DatabaseConnection, org_id: Uuid, id: i64) -> StoreResult<Pool> {
    let row = PoolEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .filter(|m| m.org_id == org_id)
        .ok_or(StoreError::NotFound)?;
    conv::pool_from_model(row)
}

/// Pools that overlap `cidr` in the organization are found either through a
/// native Postgres `inet` containment scan or, on backends without a native
/// prefix type, by loading every live pool and testing containment with
/// [`cloudpam_cidr::overlaps`] in process.
///
/// A pool that overlaps only because it is `parent` or one of `parent`'s
/// ancestors is not a conflict: since every pool's range is contained
/// within its parent's by construction, that relationship collapses to
/// "the candidate's range contains (or equals) the parent's range", which
/// the Postgres path tests with the same `inet` operators.
async fn find_overlap(db: &impl ConnectionTrait, org_id: Uuid, cidr: &Cidr, parent: Option<&Pool>) -> StoreResult<Option<(i64, String)>> {
    if db.get_database_backend() == DatabaseBackend::Postgres {
        let rows = db
            .query_all(Statement::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"SELECT id, cidr FROM pools
                   WHERE org_id = $1 AND deleted_at IS NULL
                     AND (cidr::inet >>= $2::inet OR cidr::inet <<= $2::inet)"#,
                [org_id.into(), cidr.to_string().into()],
            ))
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        for row in rows {
            let id: i64 = row.try_get("", "id").map_err(|e| StoreError::Internal(e.to_string()))?;
            let other_cidr: String = row.try_get("", "cidr").map_err(|e| StoreError::Internal(e.to_string()))?;
            let is_parent_chain = match parent {
                Some(p) if id == p.id => true,
                Some(p) => {
                    let other: Cidr = other_cidr.parse().map_err(|e: cloudpam_cidr::CidrError| StoreError::Internal(e.to_string()))?;
                    cloudpam_cidr::contains(&other, &p.cidr)
                }
                None => false,
            };
            if !is_parent_chain {
                return Ok(Some((id, other_cidr)));
            }
        }
        Ok(None)
    } else {
        let all = load_live(db, org_id).await?;
        for other in &all {
            if cloudpam_cidr::overlaps(&other.cidr, cidr) && !is_ancestor_or_descendant_of_cidr(&all, other.id, parent.map(|p| p.id)) {
                return Ok(Some((other.id, other.cidr.to_string())));
            }
        }
        Ok(None)
    }
}

/// Serializes concurrent inserts for the same organization so two requests
/// racing to claim overlapping ranges can't both pass the overlap check
/// before either commits. Postgres offers a true advisory lock; other
/// backends fall back to the transaction's own isolation (SQLite's pool is
/// capped to a single connection, so writers are already serialized).
async fn lock_org_for_insert(txn: &impl ConnectionTrait, org_id: Uuid) -> StoreResult<()> {
    if txn.get_database_backend() == DatabaseBackend::Postgres {
        txn.execute(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT pg_advisory_xact_lock(hashtext($1))",
            [org_id.to_string().into()],
        ))
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    }
    Ok(())
}

pub(crate) async fn create_pool(db: &DatabaseConnection, new: NewPool) -> StoreResult<Pool> {
    let cidr: Cidr = cloudpam_core::validation::validate_pool_cidr(&new.cidr).map_err(StoreError::from)?;

    let parent = match new.parent_id {
        Some(parent_id) => Some(get_pool(db, new.org_id, parent_id).await?),
        None => None,
    };
    if let Some(parent) = &parent {
        if !cloudpam_cidr::contains(&parent.cidr, &cidr) {
            return Err(StoreError::Validation(format!("{cidr} is not contained within parent {}", parent.cidr)));
        }
    }

    let txn = db.begin().await.map_err(|e| StoreError::Internal(e.to_string()))?;
    lock_org_for_insert(&txn, new.org_id).await?;

    if let Some((other_id, other_cidr)) = find_overlap(&txn, new.org_id, &cidr, parent.as_ref()).await? {
        return Err(StoreError::Conflict(format!("{cidr} overlaps existing pool {other_id} ({other_cidr})")));
    }

    let now = Utc::now();
    let active = pool::ActiveModel {
        id: sea_orm::NotSet,
        org_id: Set(new.org_id),
        name: Set(new.name),
        cidr: Set(cidr.to_string()),
        parent_id: Set(new.parent_id),
        account_id: Set(new.account_id),
        pool_type: Set(conv::pool_type_to_str(new.pool_type).to_owned()),
        status: Set(conv::pool_status_to_str(new.status).to_owned()),
        source: Set(conv::pool_source_to_str(new.source).to_owned()),
        description: Set(new.description),
        tags: Set(serde_json::to_value(&new.tags).unwrap_or_default()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    let row = active.insert(&txn).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    txn.commit().await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::pool_from_model(row)
}

pub(crate) async fn update_pool(db: &DatabaseConnection, org_id: Uuid, id: i64, update: PoolUpdate) -> StoreResult<Pool> {
    let mut p = get_pool(db, org_id, id).await?;
    if let Some(name) = update.name {
        p.name = name;
    }
    if let Some(account_id) = update.account_id {
        p.account_id = account_id;
    }
    if let Some(pool_type) = update.pool_type {
        p.pool_type = pool_type;
    }
    if let Some(status) = update.status {
        p.status = status;
    }
    if let Some(description) = update.description {
        p.description = description;
    }
    if let Some(tags) = update.tags {
        p.tags = tags;
    }
    p.updated_at = Utc::now();
    let row = model_to_active(&p).update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::pool_from_model(row)
}

pub(crate) async fn delete_pool(db: &DatabaseConnection, org_id: Uuid, id: i64) -> StoreResult<()> {
    get_pool(db, org_id, id).await?;
    let has_children = PoolEntity::find()
        .filter(pool::Column::OrgId.eq(org_id))
        .filter(pool::Column::ParentId.eq(id))
        .filter(pool::Column::DeletedAt.is_null())
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .is_some();
    if has_children {
        return Err(StoreError::Conflict("pool has live children".into()));
    }
    let mut active = pool::ActiveModel {
        id: Set(id),
        ..Default::default()
    };
    active.deleted_at = Set(Some(Utc::now()));
    active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(())
}

pub(crate) async fn cascade_delete_pool(db: &DatabaseConnection, org_id: Uuid, id: i64) -> StoreResult<Vec<i64>> {
    get_pool(db, org_id, id).await?;
    let ids = subtree_ids_sql(db, org_id, id).await?;
    let now = Utc::now();
    let to_delete = ids.clone();

    db.transaction::<_, (), sea_orm::DbErr>(|txn| {
        Box::pin(async move {
            for pid in to_delete {
                let mut active = pool::ActiveModel {
                    id: Set(pid),
                    ..Default::default()
                };
                active.deleted_at = Set(Some(now));
                active.update(txn).await?;
            }
            Ok(())
        })
    })
    .await
    .map_err(|e| StoreError::Internal(e.to_string()))?;

    Ok(ids)
}

pub(crate) async fn list_children(db: &DatabaseConnection, org_id: Uuid, parent_id: i64) -> StoreResult<Vec<Pool>> {
    get_pool(db, org_id, parent_id).await?;
    let rows = PoolEntity::find()
        .filter(pool::Column::OrgId.eq(org_id))
        .filter(pool::Column::ParentId.eq(parent_id))
        .filter(pool::Column::DeletedAt.is_null())
        .order_by_asc(pool::Column::Id)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    rows.into_iter().map(conv::pool_from_model).collect()
}

pub(crate) async fn hierarchy(db: &DatabaseConnection, org_id: Uuid, root: Option<i64>) -> StoreResult<Vec<PoolNode>> {
    if let Some(root) = root {
        let ids = subtree_ids_sql(db, org_id, root).await?;
        let rows = PoolEntity::find()
            .filter(pool::Column::OrgId.eq(org_id))
            .filter(pool::Column::Id.is_in(ids))
            .order_by_asc(pool::Column::Id)
            .all(db)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let subtree = rows.into_iter().map(conv::pool_from_model).collect::<StoreResult<Vec<_>>>()?;
        let pool = subtree.iter().find(|p| p.id == root).cloned().ok_or(StoreError::NotFound)?;
        Ok(vec![build_node(&subtree, pool)])
    } else {
        let all = load_live(db, org_id).await?;
        let mut roots: Vec<Pool> = all.iter().filter(|p| p.parent_id.is_none()).cloned().collect();
        roots.sort_by_key(|p| p.id);
        Ok(roots.into_iter().map(|p| build_node(&all, p)).collect())
    }
}

fn build_node(all: &[Pool], pool: Pool) -> PoolNode {
    let children = live_children(all, pool.id).into_iter().map(|c| build_node(all, c)).collect();
    PoolNode { pool, children }
}

pub(crate) async fn get_pool_with_stats(db: &DatabaseConnection, org_id: Uuid, id: i64) -> StoreResult<(Pool, PoolStats)> {
    let pool = get_pool(db, org_id, id).await?;
    let children = list_children(db, org_id, id).await?;
    let total_ips = pool.cidr.host_count();
    let used_ips: u64 = children.iter().map(|c| c.cidr.host_count()).sum();
    let available_ips = total_ips.saturating_sub(used_ips);
    let utilization_pct = if total_ips == 0 { 0.0 } else { used_ips as f64 / total_ips as f64 * 100.0 };
    let child_count = subtree_ids_sql(db, org_id, pool.id).await?.len() as u32 - 1;
    let stats = PoolStats {
        total_ips,
        used_ips,
        available_ips,
        utilization_pct,
        direct_children: children.len() as u32,
        child_count,
    };
    Ok((pool, stats))
}
