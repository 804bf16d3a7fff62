use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use cloudpam_core::model::{Account, AccountUpdate, NewAccount};
use cloudpam_store::{AccountFilter, Page, PageRequest, StoreError, StoreResult};

use crate::conv;
use crate::entities::account::{self, Entity as AccountEntity};
use crate::entities::pool::{self, Entity as PoolEntity};

pub(crate) async fn list_accounts(db: &DatabaseConnection, org_id: Uuid, filter: &AccountFilter, page: PageRequest) -> StoreResult<Page<Account>> {
    let mut q = AccountEntity::find().filter(account::Column::OrgId.eq(org_id));
    if !filter.include_deleted {
        q = q.filter(account::Column::DeletedAt.is_null());
    }
    let rows = q
        .order_by_asc(account::Column::Id)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let mut matched: Vec<Account> = rows.into_iter().map(conv::account_from_model).collect::<StoreResult<Vec<_>>>()?;
    matched.retain(|a| filter.provider.is_none_or(|p| a.provider == p));

    let total = matched.len() as u64;
    let items = matched.into_iter().skip(page.offset() as usize).take(page.page_size as usize).collect();
    Ok(Page::new(items, total, page.page, page.page_size))
}

pub(crate) async fn get_account(db: &DatabaseConnection, org_id: Uuid, id: i64) -> StoreResult<Account> {
    let row = AccountEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .filter(|m| m.org_id == org_id)
        .ok_or(StoreError::NotFound)?;
    conv::account_from_model(row)
}

pub(crate) async fn create_account(db: &DatabaseConnection, new: NewAccount) -> StoreResult<Account> {
    let (provider, _id) = cloudpam_core::validation::validate_full_account_key(&new.key).map_err(StoreError::from)?;

    let key_taken = AccountEntity::find()
        .filter(account::Column::OrgId.eq(new.org_id))
        .filter(account::Column::Key.eq(new.key.clone()))
        .filter(account::Column::DeletedAt.is_null())
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .is_some();
    if key_taken {
        return Err(StoreError::Conflict(format!("account key `{}` already in use", new.key)));
    }

    let now = Utc::now();
    let active = account::ActiveModel {
        id: sea_orm::NotSet,
        org_id: Set(new.org_id),
        key: Set(new.key),
        name: Set(new.name),
        provider: Set(conv::provider_to_str(provider).to_owned()),
        external_id: Set(new.external_id),
        description: Set(new.description),
        platform: Set(new.platform),
        tier: Set(new.tier),
        environment: Set(new.environment),
        regions: Set(serde_json::to_value(&new.regions).unwrap_or_default()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    let row = active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::account_from_model(row)
}

pub(crate) async fn update_account(db: &DatabaseConnection, org_id: Uuid, id: i64, update: AccountUpdate) -> StoreResult<Account> {
    let mut a = get_account(db, org_id, id).await?;
    if let Some(name) = update.name {
        a.name = name;
    }
    if let Some(external_id) = update.external_id {
        a.external_id = external_id;
    }
    if let Some(description) = update.description {
        a.description = description;
    }
    if let Some(platform) = update.platform {
        a.platform = platform;
    }
    if let Some(tier) = update.tier {
        a.tier = tier;
    }
    if let Some(environment) = update.environment {
        a.environment = environment;
    }
    if let Some(regions) = update.regions {
        a.regions = regions;
    }
    a.updated_at = Utc::now();

    let active = account::ActiveModel {
        id: Set(a.id),
        org_id: Set(a.org_id),
        key: Set(a.key.clone()),
        name: Set(a.name.clone()),
        provider: Set(conv::provider_to_str(a.provider).to_owned()),
        external_id: Set(a.external_id.clone()),
        description: Set(a.description.clone()),
        platform: Set(a.platform.clone()),
        tier: Set(a.tier.clone()),
        environment: Set(a.environment.clone()),
        regions: Set(serde_json::to_value(&a.regions).unwrap_or_default()),
        created_at: Set(a.created_at),
        updated_at: Set(a.updated_at),
        deleted_at: Set(a.deleted_at),
    };
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::account_from_model(row)
}

pub(crate) async fn delete_account(db: &DatabaseConnection, org_id: Uuid, id: i64, force: bool) -> StoreResult<()> {
    get_account(db, org_id, id).await?;

    let referenced: Vec<i64> = PoolEntity::find()
        .filter(pool::Column::OrgId.eq(org_id))
        .filter(pool::Column::AccountId.eq(id))
        .filter(pool::Column::DeletedAt.is_null())
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .into_iter()
        .map(|p| p.id)
        .collect();

    if !referenced.is_empty() && !force {
        return Err(StoreError::Conflict(
            "account is referenced by live pools; pass force to cascade".into(),
        ));
    }

    let now = Utc::now();
    if force {
        for pool_id in referenced {
            crate::pools::cascade_delete_pool(db, org_id, pool_id).await?;
        }
    }

    let mut active = account::ActiveModel {
        id: Set(id),
        ..Default::default()
    };
    active.deleted_at = Set(Some(now));
    active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(())
}
