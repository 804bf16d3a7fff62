use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use cloudpam_core::model::{ApiKey, NewUser, Session, User};
use cloudpam_store::{Page, PageRequest, StoreError, StoreResult};

use crate::conv;
use crate::entities::api_key::{self, Entity as ApiKeyEntity};
use crate::entities::session::{self, Entity as SessionEntity};
use crate::entities::user::{self, Entity as UserEntity};

pub(crate) async fn create_user(db: &DatabaseConnection, new: NewUser) -> StoreResult<User> {
    let taken = UserEntity::find()
        .filter(user::Column::OrgId.eq(new.org_id))
        .filter(user::Column::Username.eq(new.username.clone()))
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .is_some();
    if taken {
        return Err(StoreError::Conflict(format!("username `{}` already in use", new.username)));
    }

    let now = Utc::now();
    let active = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        org_id: Set(new.org_id),
        username: Set(new.username),
        email: Set(new.email),
        display_name: Set(new.display_name),
        role: Set(conv::role_to_str(new.role).to_owned()),
        password_hash: Set(new.password_hash),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let row = active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::user_from_model(row)
}

pub(crate) async fn get_user(db: &DatabaseConnection, org_id: Uuid, id: Uuid) -> StoreResult<User> {
    let row = UserEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .filter(|u| u.org_id == org_id)
        .ok_or(StoreError::NotFound)?;
    conv::user_from_model(row)
}

pub(crate) async fn get_user_by_username(db: &DatabaseConnection, org_id: Uuid, username: &str) -> StoreResult<User> {
    let row = UserEntity::find()
        .filter(user::Column::OrgId.eq(org_id))
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    conv::user_from_model(row)
}

pub(crate) async fn list_users(db: &DatabaseConnection, org_id: Uuid, page: PageRequest) -> StoreResult<Page<User>> {
    let rows = UserEntity::find()
        .filter(user::Column::OrgId.eq(org_id))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let matched: Vec<User> = rows.into_iter().map(conv::user_from_model).collect::<StoreResult<Vec<_>>>()?;
    let total = matched.len() as u64;
    let items = matched.into_iter().skip(page.offset() as usize).take(page.page_size as usize).collect();
    Ok(Page::new(items, total, page.page, page.page_size))
}

pub(crate) async fn update_user(db: &DatabaseConnection, org_id: Uuid, mut user: User) -> StoreResult<User> {
    get_user(db, org_id, user.id).await?;
    user.updated_at = Utc::now();
    let active = user::ActiveModel {
        id: Set(user.id),
        org_id: Set(user.org_id),
        username: Set(user.username.clone()),
        email: Set(user.email.clone()),
        display_name: Set(user.display_name.clone()),
        role: Set(conv::role_to_str(user.role).to_owned()),
        password_hash: Set(user.password_hash.clone()),
        active: Set(user.active),
        created_at: Set(user.created_at),
        updated_at: Set(user.updated_at),
    };
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::user_from_model(row)
}

pub(crate) async fn delete_user(db: &DatabaseConnection, org_id: Uuid, id: Uuid) -> StoreResult<()> {
    get_user(db, org_id, id).await?;
    UserEntity::delete_by_id(id).exec(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(())
}

pub(crate) async fn create_session(db: &DatabaseConnection, session: Session) -> StoreResult<Session> {
    let active = session::ActiveModel {
        id: Set(session.id.clone()),
        user_id: Set(session.user_id),
        created_at: Set(session.created_at),
        expires_at: Set(session.expires_at),
        last_used_at: Set(session.last_used_at),
        ip: Set(session.ip.map(|ip| ip.to_string())),
        user_agent: Set(session.user_agent.clone()),
    };
    let row = active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(conv::session_from_model(row))
}

pub(crate) async fn get_session(db: &DatabaseConnection, id: &str) -> StoreResult<Session> {
    let row = SessionEntity::find_by_id(id.to_owned())
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    Ok(conv::session_from_model(row))
}

pub(crate) async fn list_sessions_for_user(db: &DatabaseConnection, user_id: Uuid) -> StoreResult<Vec<Session>> {
    let rows = SessionEntity::find()
        .filter(session::Column::UserId.eq(user_id))
        .order_by_desc(session::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(rows.into_iter().map(conv::session_from_model).collect())
}

pub(crate) async fn touch_session(db: &DatabaseConnection, id: &str, now: DateTime<Utc>) -> StoreResult<Session> {
    let row = SessionEntity::find_by_id(id.to_owned())
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    let mut active: session::ActiveModel = row.into();
    active.last_used_at = Set(now);
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(conv::session_from_model(row))
}

pub(crate) async fn delete_session(db: &DatabaseConnection, id: &str) -> StoreResult<()> {
    SessionEntity::delete_by_id(id.to_owned()).exec(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(())
}

pub(crate) async fn cleanup_expired_sessions(db: &DatabaseConnection, now: DateTime<Utc>) -> StoreResult<u64> {
    let result = SessionEntity::delete_many()
        .filter(session::Column::ExpiresAt.lte(now))
        .exec(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(result.rows_affected)
}

pub(crate) async fn create_api_key(db: &DatabaseConnection, key: ApiKey) -> StoreResult<ApiKey> {
    let taken = ApiKeyEntity::find()
        .filter(api_key::Column::Prefix.eq(key.prefix.clone()))
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .is_some();
    if taken {
        return Err(StoreError::Conflict("API key prefix collision".into()));
    }
    let active = api_key::ActiveModel {
        id: Set(key.id),
        org_id: Set(key.org_id),
        name: Set(key.name.clone()),
        prefix: Set(key.prefix.clone()),
        secret_hash: Set(key.secret_hash.clone()),
        scopes: Set(conv::scopes_to_json(&key.scopes)),
        created_by: Set(key.created_by),
        expires_at: Set(key.expires_at),
        created_at: Set(key.created_at),
        last_used_at: Set(key.last_used_at),
        revoked: Set(key.revoked),
    };
    let row = active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::api_key_from_model(row)
}

pub(crate) async fn list_api_keys(db: &DatabaseConnection, org_id: Uuid, user_id: Option<Uuid>) -> StoreResult<Vec<ApiKey>> {
    let rows = ApiKeyEntity::find()
        .filter(api_key::Column::OrgId.eq(org_id))
        .order_by_asc(api_key::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let mut keys: Vec<ApiKey> = rows.into_iter().map(conv::api_key_from_model).collect::<StoreResult<Vec<_>>>()?;
    keys.retain(|k| user_id.is_none_or(|uid| k.created_by == Some(uid)));
    Ok(keys)
}

pub(crate) async fn get_api_key_by_prefix(db: &DatabaseConnection, prefix: &str) -> StoreResult<ApiKey> {
    let row = ApiKeyEntity::find()
        .filter(api_key::Column::Prefix.eq(prefix))
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    conv::api_key_from_model(row)
}

pub(crate) async fn revoke_api_key(db: &DatabaseConnection, org_id: Uuid, id: Uuid) -> StoreResult<()> {
    let row = ApiKeyEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .filter(|k| k.org_id == org_id)
        .ok_or(StoreError::NotFound)?;
    let mut active: api_key::ActiveModel = row.into();
    active.revoked = Set(true);
    active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(())
}
