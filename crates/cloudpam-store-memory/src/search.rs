use uuid::Uuid;

use cloudpam_cidr::contains;
use cloudpam_store::{Page, PageRequest, SearchHit, SearchQuery, SearchResultKind, StoreResult};

use crate::state::Inner;

impl Inner {
    pub(crate) fn search(&self, org_id: Uuid, query: &SearchQuery, page: PageRequest) -> StoreResult<Page<SearchHit>> {
        let text = query.text.as_ref().map(|t| t.to_lowercase());
        let mut hits: Vec<SearchHit> = Vec::new();

        if query.kind.is_none_or(|k| k == SearchResultKind::Pool) {
            let mut pools: Vec<_> = self.live_pools(org_id).collect();
            pools.sort_by_key(|p| p.id);
            for pool in pools {
                if let Some(text) = &text {
                    let matches = pool.name.to_lowercase().contains(text.as_str())
                        || pool.cidr.to_string().contains(text.as_str())
                        || pool.description.as_deref().unwrap_or_default().to_lowercase().contains(text.as_str());
                    if !matches {
                        continue;
                    }
                }
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
                hits.push(SearchHit {
                    kind: SearchResultKind::Pool,
                    pool: Some(pool.clone()),
                    account: None,
                });
            }
        }

        if query.kind.is_none_or(|k| k == SearchResultKind::Account)
            && query.cidr_contains.is_none()
            && query.cidr_within.is_none()
        {
            let mut accounts: Vec<_> = self.accounts.values().filter(|a| a.org_id == org_id && a.is_live()).collect();
            accounts.sort_by_key(|a| a.id);
            for account in accounts {
                if let Some(text) = &text {
                    let matches = account.name.to_lowercase().contains(text.as_str())
                        || account.key.to_lowercase().contains(text.as_str())
                        || account.description.as_deref().unwrap_or_default().to_lowercase().contains(text.as_str());
                    if !matches {
                        continue;
                    }
                }
                hits.push(SearchHit {
                    kind: SearchResultKind::Account,
                    pool: None,
                    account: Some(account.clone()),
                });
            }
        }

        let total = hits.len() as u64;
        let items = hits
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect();
        Ok(Page::new(items, total, page.page, page.page_size))
    }
}
