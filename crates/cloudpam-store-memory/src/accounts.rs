use uuid::Uuid;

use cloudpam_core::model::{Account, AccountUpdate, NewAccount};
use cloudpam_store::{AccountFilter, Page, PageRequest, StoreError, StoreResult};

use crate::state::Inner;

impl Inner {
    pub(crate) fn list_accounts(
        &self,
        org_id: Uuid,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Account>> {
        let mut matched: Vec<&Account> = self
            .accounts
            .values()
            .filter(|a| a.org_id == org_id)
            .filter(|a| filter.include_deleted || a.is_live())
            .filter(|a| filter.provider.is_none_or(|p| a.provider == p))
            .collect();
        matched.sort_by_key(|a| a.id);
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total, page.page, page.page_size))
    }

    pub(crate) fn get_account(&self, org_id: Uuid, id: i64) -> StoreResult<Account> {
        self.accounts
            .get(&id)
            .filter(|a| a.org_id == org_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub(crate) fn create_account(&mut self, new: NewAccount) -> StoreResult<Account> {
        let (provider, _id) = cloudpam_core::validation::validate_full_account_key(&new.key)
            .map_err(StoreError::from)?;

        let key_taken = self
            .accounts
            .values()
            .any(|a| a.org_id == new.org_id && a.is_live() && a.key == new.key);
        if key_taken {
            return Err(StoreError::Conflict(format!("account key `{}` already in use", new.key)));
        }

        let id = self.next_account_id();
        let now = Inner::now();
        let account = Account {
            id,
            org_id: new.org_id,
            key: new.key,
            name: new.name,
            provider,
            external_id: new.external_id,
            description: new.description,
            platform: new.platform,
            tier: new.tier,
            environment: new.environment,
            regions: new.regions,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    pub(crate) fn update_account(&mut self, org_id: Uuid, id: i64, update: AccountUpdate) -> StoreResult<Account> {
        let mut account = self.get_account(org_id, id)?;
        if let Some(name) = update.name {
            account.name = name;
        }
        if let Some(external_id) = update.external_id {
            account.external_id = external_id;
        }
        if let Some(description) = update.description {
            account.description = description;
        }
        if let Some(platform) = update.platform {
            account.platform = platform;
        }
        if let Some(tier) = update.tier {
            account.tier = tier;
        }
        if let Some(environment) = update.environment {
            account.environment = environment;
        }
        if let Some(regions) = update.regions {
            account.regions = regions;
        }
        account.updated_at = Inner::now();
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    pub(crate) fn delete_account(&mut self, org_id: Uuid, id: i64, force: bool) -> StoreResult<()> {
        self.get_account(org_id, id)?;
        let referenced: Vec<i64> = self
            .live_pools(org_id)
            .filter(|p| p.account_id == Some(id))
            .map(|p| p.id)
            .collect();

        if !referenced.is_empty() && !force {
            return Err(StoreError::Conflict(
                "account is referenced by live pools; pass force to cascade".into(),
            ));
        }

        let now = Inner::now();
        if force {
            let mut subtree: Vec<i64> = Vec::new();
            for pool_id in referenced {
                subtree.extend(self.subtree_ids(org_id, pool_id));
            }
            for pid in subtree {
                if let Some(pool) = self.pools.get_mut(&pid) {
                    pool.deleted_at = Some(now);
                }
            }
        }

        if let Some(account) = self.accounts.get_mut(&id) {
            account.deleted_at = Some(now);
        }
        Ok(())
    }
}
