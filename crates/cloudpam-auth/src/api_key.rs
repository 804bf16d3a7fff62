//! API key minting and lookup: `cpam_v1_<8-char prefix>_<secret>`, where
//! only the prefix and a hash of the secret are ever stored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use cloudpam_core::model::{ApiKey, Permission};
use cloudpam_store::{Store, StoreError, StoreResult};

const PREFIX_LEN: usize = 8;
const SECRET_LEN: usize = 32;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
}

#[must_use]
pub fn hash_secret(full_key: &str) -> String {
    hex::encode(Sha256::digest(full_key.as_bytes()))
}

pub struct MintedKey {
    pub record: ApiKey,
    /// Shown to the caller exactly once; never stored or logged.
    pub full_key: String,
}

pub struct ApiKeyService {
    store: Arc<dyn Store>,
}

impl ApiKeyService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn mint(
        &self,
        org_id: Uuid,
        name: String,
        scopes: Vec<Permission>,
        created_by: Option<Uuid>,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<MintedKey> {
        let prefix = random_alphanumeric(PREFIX_LEN);
        let secret = random_alphanumeric(SECRET_LEN);
        let full_key = format!("cpam_v1_{prefix}_{secret}");
        let record = ApiKey {
            id: Uuid::new_v4(),
            org_id,
            name,
            prefix,
            secret_hash: hash_secret(&full_key),
            scopes,
            created_by,
            expires_at,
            created_at: Utc::now(),
            last_used_at: None,
            revoked: false,
        };
        let record = self.store.create_api_key(record).await?;
        Ok(MintedKey { record, full_key })
    }

    /// Parses `cpam_v1_<prefix>_<secret>`, looks the prefix up, and checks
    /// the full secret's hash against the stored one.
    pub async fn authenticate(&self, presented: &str) -> StoreResult<ApiKey> {
        let rest = presented.strip_prefix("cpam_v1_").ok_or_else(|| StoreError::Validation("malformed API key".into()))?;
        let (prefix, _secret) = rest.split_once('_').ok_or_else(|| StoreError::Validation("malformed API key".into()))?;

        let key = self.store.get_api_key_by_prefix(prefix).await?;
        if hash_secret(presented) != key.secret_hash {
            return Err(StoreError::Validation("API key mismatch".into()));
        }
        if !key.is_valid(Utc::now()) {
            return Err(StoreError::Validation("API key is revoked or expired".into()));
        }
        Ok(key)
    }

    pub async fn list(&self, org_id: Uuid, user_id: Option<Uuid>) -> StoreResult<Vec<ApiKey>> {
        self.store.list_api_keys(org_id, user_id).await
    }

    pub async fn revoke(&self, org_id: Uuid, id: Uuid) -> StoreResult<()> {
        self.store.revoke_api_key(org_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpam_core::model::{Action, Resource};
    use cloudpam_store_memory::MemoryStore;

    #[tokio::test]
    async fn mint_then_authenticate_round_trips() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let svc = ApiKeyService::new(store);
        let minted = svc
            .mint(Uuid::new_v4(), "ci".into(), vec![Permission::new(Resource::Pools, Action::Read)], None, None)
            .await
            .unwrap();
        let authenticated = svc.authenticate(&minted.full_key).await.unwrap();
        assert_eq!(authenticated.id, minted.record.id);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let svc = ApiKeyService::new(store);
        let minted = svc.mint(Uuid::new_v4(), "ci".into(), vec![], None, None).await.unwrap();
        let tampered = format!("{}x", minted.full_key);
        assert!(svc.authenticate(&tampered).await.is_err());
    }
}
