use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Statement};
use uuid::Uuid;

use cloudpam_cidr::contains;
use cloudpam_store::{Page, PageRequest, SearchHit, SearchQuery, SearchResultKind, StoreError, StoreResult};

use crate::conv;
use crate::entities::account::{self, Entity as AccountEntity};
use crate::entities::pool::{self, Entity as PoolEntity};

/// Candidate pool ids matching the CIDR predicates, pushed down to native
/// `inet` operators on Postgres. `None` means "no CIDR predicate applies"
/// (every live pool is a candidate); other backends filter in process
/// after the full scan below instead of narrowing here.
async fn cidr_candidate_ids(db: &DatabaseConnection, org_id: Uuid, query: &SearchQuery) -> StoreResult<Option<Vec<i64>>> {
    if db.get_database_backend() != DatabaseBackend::Postgres {
        return Ok(None);
    }
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    if let Some(addr_prefix) = &query.cidr_contains {
        conditions.push(format!("cidr::inet >>= ${}::inet", values.len() + 2));
        values.push(addr_prefix.to_string().into());
    }
    if let Some(within) = &query.cidr_within {
        conditions.push(format!("cidr::inet <<= ${}::inet", values.len() + 2));
        values.push(within.to_string().into());
    }
    if conditions.is_empty() {
        return Ok(None);
    }
    let sql = format!(
        "SELECT id FROM pools WHERE org_id = $1 AND deleted_at IS NULL AND {}",
        conditions.join(" AND ")
    );
    let mut all_values = vec![org_id.into()];
    all_values.extend(values);
    let rows = db
        .query_all(Statement::from_sql_and_values(DatabaseBackend::Postgres, sql, all_values))
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let ids = rows
        .into_iter()
        .map(|row| row.try_get::<i64>("", "id").map_err(|e| StoreError::Internal(e.to_string())))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(Some(ids))
}

pub(crate) async fn search(db: &DatabaseConnection, org_id: Uuid, query: &SearchQuery, page: PageRequest) -> StoreResult<Page<SearchHit>> {
    let text = query.text.as_ref().map(|t| t.to_lowercase());
    let mut hits: Vec<SearchHit> = Vec::new();

    if query.kind.is_none_or(|k| k == SearchResultKind::Pool) {
        let candidate_ids = cidr_candidate_ids(db, org_id, query).await?;
        let mut finder = PoolEntity::find()
            .filter(pool::Column::OrgId.eq(org_id))
            .filter(pool::Column::DeletedAt.is_null())
            .order_by_asc(pool::Column::Id);
        if let Some(ids) = &candidate_ids {
            finder = finder.filter(pool::Column::Id.is_in(ids.clone()));
        }
        let rows = finder.all(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
        for row in rows {
            let pool = conv::pool_from_model(row)?;
            if let Some(text) = &text {
                let matches = pool.name.to_lowercase().contains(text.as_str())
                    || pool.cidr.to_string().contains(text.as_str())
                    || pool.description.as_deref().unwrap_or_default().to_lowercase().contains(text.as_str());
                if !matches {
                    continue;
                }
            }
            // Native operators already enforced both predicates on Postgres;
            // other backends still need the in-process check.
            if candidate_ids.is_none() {
                if let Some(addr_prefix) = &query.cidr_contains {
                    if !contains(&pool.cidr, addr_prefix) {
                        continue;
                    }
                }
                if let Some(within) = &query.cidr_within {
                    if !contains(within, &pool.cidr) {
                        continue;
                    }
                }
            }
            hits.push(SearchHit { kind: SearchResultKind::Pool, pool: Some(pool), account: None });
        }
    }

    if query.kind.is_none_or(|k| k == SearchResultKind::Account) && query.cidr_contains.is_none() && query.cidr_within.is_none() {
        let rows = AccountEntity::find()
            .filter(account::Column::OrgId.eq(org_id))
            .filter(account::Column::DeletedAt.is_null())
            .order_by_asc(account::Column::Id)
            .all(db)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        for row in rows {
            let account = conv::account_from_model(row)?;
            if let Some(text) = &text {
                let matches = account.name.to_lowercase().contains(text.as_str())
                    || account.key.to_lowercase().contains(text.as_str())
                    || account.description.as_deref().unwrap_or_default().to_lowercase().contains(text.as_str());
                if !matches {
                    continue;
                }
            }
            hits.push(SearchHit { kind: SearchResultKind::Account, pool: None, account: Some(account) });
        }
    }

    let total = hits.len() as u64;
    let items = hits.into_iter().skip(page.offset() as usize).take(page.page_size as usize).collect();
    Ok(Page::new(items, total, page.page, page.page_size))
}
