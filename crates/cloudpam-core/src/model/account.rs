use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
    Onprem,
}

impl Provider {
    #[must_use]
    pub fn as_key_prefix(self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Azure => "azure",
            Provider::Onprem => "onprem",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub org_id: uuid::Uuid,
    /// `provider:id`, globally unique within the organization.
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
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub org_id: uuid::Uuid,
    pub key: String,
    pub name: String,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub platform: Option<String>,
    pub tier: Option<String>,
    pub environment: Option<String>,
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub external_id: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub platform: Option<Option<String>>,
    pub tier: Option<Option<String>>,
    pub environment: Option<Option<String>>,
    pub regions: Option<Vec<String>>,
}
