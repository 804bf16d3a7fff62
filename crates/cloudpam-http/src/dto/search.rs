use serde::{Deserialize, Serialize};

use cloudpam_store::{SearchHit, SearchQuery, SearchResultKind};

use super::account::AccountResponse;
use super::pool::{parse_cidr, PoolResponse};
use crate::problem::Problem;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQueryParams {
    pub q: Option<String>,
    pub cidr_contains: Option<String>,
    pub cidr_within: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl SearchQueryParams {
    pub fn into_query(self) -> Result<SearchQuery, Problem> {
        let kind = match self.kind.as_deref() {
            None => None,
            Some("pool") => Some(SearchResultKind::Pool),
            Some("account") => Some(SearchResultKind::Account),
            Some(other) => {
                return Err(Problem::new(cloudpam_core::error::Kind::Validation, format!("unknown search type `{other}`")))
            }
        };
        Ok(SearchQuery {
            text: self.q,
            cidr_contains: self.cidr_contains.as_deref().map(parse_cidr).transpose()?,
            cidr_within: self.cidr_within.as_deref().map(parse_cidr).transpose()?,
            kind,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchHitResponse {
    Pool { pool: PoolResponse },
    Account { account: AccountResponse },
}

impl From<SearchHit> for SearchHitResponse {
    fn from(hit: SearchHit) -> Self {
        match hit.kind {
            SearchResultKind::Pool => SearchHitResponse::Pool { pool: hit.pool.expect("pool hit carries a pool").into() },
            SearchResultKind::Account => SearchHitResponse::Account { account: hit.account.expect("account hit carries an account").into() },
        }
    }
}
