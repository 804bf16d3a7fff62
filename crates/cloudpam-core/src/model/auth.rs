use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Operator,
    Viewer,
    Auditor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Pools,
    Accounts,
    ApiKeys,
    Audit,
    Users,
    Discovery,
    Recommendations,
    Analysis,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    List,
    Update,
    Delete,
}

/// A permission is always `<resource>:<action>`, serialized as that string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    pub resource: Resource,
    pub action: Action,
}

impl Permission {
    #[must_use]
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            serde_json::to_value(self.resource).unwrap(),
            serde_json::to_value(self.action).unwrap()
        )
    }
}

/// Returns the permissions granted to a built-in role.
#[must_use]
pub fn role_permissions(role: Role) -> &'static [Permission] {
    use Action::{Create, Delete, List, Read, Update};
    use Resource::{Accounts, ApiKeys, Audit, Discovery, Pools, Recommendations, Analysis, Settings, Users};

    const ALL_RESOURCES: &[Resource] = &[
        Pools,
        Accounts,
        ApiKeys,
        Audit,
        Users,
        Discovery,
        Recommendations,
        Analysis,
        Settings,
    ];
    const ALL_ACTIONS: &[Action] = &[Create, Read, List, Update, Delete];

    static ADMIN: std::sync::OnceLock<Vec<Permission>> = std::sync::OnceLock::new();
    static OPERATOR: std::sync::OnceLock<Vec<Permission>> = std::sync::OnceLock::new();
    static VIEWER: std::sync::OnceLock<Vec<Permission>> = std::sync::OnceLock::new();
    static AUDITOR: std::sync::OnceLock<Vec<Permission>> = std::sync::OnceLock::new();

    match role {
        Role::Admin => ADMIN.get_or_init(|| {
            ALL_RESOURCES
                .iter()
                .flat_map(|r| ALL_ACTIONS.iter().map(move |a| Permission::new(*r, *a)))
                .collect()
        }),
        Role::Operator => OPERATOR.get_or_init(|| {
            vec![
                Permission::new(Pools, Create),
                Permission::new(Pools, Read),
                Permission::new(Pools, List),
                Permission::new(Pools, Update),
                Permission::new(Accounts, Create),
                Permission::new(Accounts, Read),
                Permission::new(Accounts, List),
                Permission::new(Accounts, Update),
            ]
        }),
        Role::Viewer => VIEWER.get_or_init(|| {
            vec![
                Permission::new(Pools, Read),
                Permission::new(Pools, List),
                Permission::new(Accounts, Read),
                Permission::new(Accounts, List),
            ]
        }),
        Role::Auditor => AUDITOR.get_or_init(|| {
            vec![Permission::new(Audit, Read), Permission::new(Audit, List)]
        }),
    }
}

#[must_use]
pub fn role_has_permission(role: Role, perm: Permission) -> bool {
    role_permissions(role).contains(&perm)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub org_id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub org_id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// The stable 8-char lookup prefix (`cpam_v1_<prefix>_...`).
    pub prefix: String,
    pub secret_hash: String,
    pub scopes: Vec<Permission>,
    pub created_by: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

impl ApiKey {
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if self.revoked {
            return false;
        }
        self.expires_at.is_none_or(|exp| now < exp)
    }
}

impl Serialize for Permission {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let (resource, action) = s
            .split_once(':')
            .ok_or_else(|| serde::de::Error::custom("permission must be `resource:action`"))?;
        let resource: Resource = serde_json::from_value(serde_json::Value::String(resource.to_owned()))
            .map_err(serde::de::Error::custom)?;
        let action: Action = serde_json::from_value(serde_json::Value::String(action.to_owned()))
            .map_err(serde::de::Error::custom)?;
        Ok(Permission::new(resource, action))
    }
}
