//! Thin validating wrapper around `Store::search`.

use std::sync::Arc;

use uuid::Uuid;

use cloudpam_store::{Page, PageRequest, SearchHit, SearchQuery, Store, StoreError, StoreResult};

pub struct SearchService {
    store: Arc<dyn Store>,
}

impl SearchService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn search(&self, org_id: Uuid, query: &SearchQuery, page: PageRequest) -> StoreResult<Page<SearchHit>> {
        if query.text.is_none() && query.cidr_contains.is_none() && query.cidr_within.is_none() {
            return Err(StoreError::Validation("search requires at least one of text, cidrContains, cidrWithin".into()));
        }
        self.store.search(org_id, query, page).await
    }
}
