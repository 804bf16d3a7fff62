use chrono::{DateTime, Utc};
use uuid::Uuid;

use cloudpam_core::model::{ApiKey, NewUser, Session, User};
use cloudpam_store::{Page, PageRequest, StoreError, StoreResult};

use crate::state::Inner;

impl Inner {
    pub(crate) fn create_user(&mut self, new: NewUser) -> StoreResult<User> {
        let taken = self
            .users
            .values()
            .any(|u| u.org_id == new.org_id && u.username == new.username);
        if taken {
            return Err(StoreError::Conflict(format!("username `{}` already in use", new.username)));
        }
        let now = Inner::now();
        let user = User {
            id: Uuid::new_v4(),
            org_id: new.org_id,
            username: new.username,
            email: new.email,
            display_name: new.display_name,
            role: new.role,
            password_hash: new.password_hash,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub(crate) fn get_user(&self, org_id: Uuid, id: Uuid) -> StoreResult<User> {
        self.users
            .get(&id)
            .filter(|u| u.org_id == org_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub(crate) fn get_user_by_username(&self, org_id: Uuid, username: &str) -> StoreResult<User> {
        self.users
            .values()
            .find(|u| u.org_id == org_id && u.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub(crate) fn list_users(&self, org_id: Uuid, page: PageRequest) -> StoreResult<Page<User>> {
        let mut users: Vec<&User> = self.users.values().filter(|u| u.org_id == org_id).collect();
        users.sort_by_key(|u| u.username.clone());
        let total = users.len() as u64;
        let items = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total, page.page, page.page_size))
    }

    pub(crate) fn update_user(&mut self, org_id: Uuid, mut user: User) -> StoreResult<User> {
        self.get_user(org_id, user.id)?;
        user.updated_at = Inner::now();
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub(crate) fn delete_user(&mut self, org_id: Uuid, id: Uuid) -> StoreResult<()> {
        self.get_user(org_id, id)?;
        self.users.remove(&id);
        Ok(())
    }

    pub(crate) fn create_session(&mut self, session: Session) -> StoreResult<Session> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    pub(crate) fn get_session(&self, id: &str) -> StoreResult<Session> {
        self.sessions.get(id).cloned().ok_or(StoreError::NotFound)
    }

    pub(crate) fn list_sessions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.values().filter(|s| s.user_id == user_id).cloned().collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(sessions)
    }

    pub(crate) fn touch_session(&mut self, id: &str, now: DateTime<Utc>) -> StoreResult<Session> {
        let session = self.sessions.get_mut(id).ok_or(StoreError::NotFound)?;
        session.last_used_at = now;
        Ok(session.clone())
    }

    pub(crate) fn delete_session(&mut self, id: &str) -> StoreResult<()> {
        self.sessions.remove(id);
        Ok(())
    }

    pub(crate) fn cleanup_expired_sessions(&mut self, now: DateTime<Utc>) -> StoreResult<u64> {
        let expired: Vec<String> = self
            .sessions
            .values()
            .filter(|s| s.is_expired(now))
            .map(|s| s.id.clone())
            .collect();
        let count = expired.len() as u64;
        for id in expired {
            self.sessions.remove(&id);
        }
        Ok(count)
    }

    pub(crate) fn create_api_key(&mut self, key: ApiKey) -> StoreResult<ApiKey> {
        let taken = self.api_keys.values().any(|k| k.prefix == key.prefix);
        if taken {
            return Err(StoreError::Conflict("API key prefix collision".into()));
        }
        self.api_keys.insert(key.id, key.clone());
        Ok(key)
    }

    pub(crate) fn list_api_keys(&self, org_id: Uuid, user_id: Option<Uuid>) -> StoreResult<Vec<ApiKey>> {
        let mut keys: Vec<ApiKey> = self
            .api_keys
            .values()
            .filter(|k| k.org_id == org_id)
            .filter(|k| user_id.is_none_or(|uid| k.created_by == Some(uid)))
            .cloned()
            .collect();
        keys.sort_by_key(|k| k.created_at);
        Ok(keys)
    }

    pub(crate) fn get_api_key_by_prefix(&self, prefix: &str) -> StoreResult<ApiKey> {
        self.api_keys
            .values()
            .find(|k| k.prefix == prefix)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub(crate) fn revoke_api_key(&mut self, org_id: Uuid, id: Uuid) -> StoreResult<()> {
        let key = self
            .api_keys
            .get_mut(&id)
            .filter(|k| k.org_id == org_id)
            .ok_or(StoreError::NotFound)?;
        key.revoked = true;
        Ok(())
    }
}
