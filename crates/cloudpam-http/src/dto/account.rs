use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cloudpam_core::model::{Account, AccountUpdate, NewAccount, Provider};

#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub org_id: Uuid,
    pub key: String,
    pub name: String,
    pub provider: Provider,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub platform: Option<String>,
    pub tier: Option<String>,
    pub environment: Option<String>,
    pub regions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            org_id: a.org_id,
            key: a.key,
            name: a.name,
            provider: a.provider,
            external_id: a.external_id,
            description: a.description,
            platform: a.platform,
            tier: a.tier,
            environment: a.environment,
            regions: a.regions,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub regions: Vec<String>,
}

impl CreateAccountRequest {
    #[must_use]
    pub fn into_new_account(self, org_id: Uuid) -> NewAccount {
        NewAccount {
            org_id,
            key: self.key,
            name: self.name,
            external_id: self.external_id,
            description: self.description,
            platform: self.platform,
            tier: self.tier,
            environment: self.environment,
            regions: self.regions,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub platform: Option<String>,
    pub tier: Option<String>,
    pub environment: Option<String>,
    pub regions: Option<Vec<String>>,
}

impl From<UpdateAccountRequest> for AccountUpdate {
    fn from(u: UpdateAccountRequest) -> Self {
        AccountUpdate {
            name: u.name,
            external_id: u.external_id.map(Some),
            description: u.description.map(Some),
            platform: u.platform.map(Some),
            tier: u.tier.map(Some),
            environment: u.environment.map(Some),
            regions: u.regions,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeleteAccountQuery {
    #[serde(default)]
    pub force: bool,
}
