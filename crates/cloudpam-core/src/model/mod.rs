pub mod account;
pub mod audit;
pub mod auth;
pub mod discovery;
pub mod pool;
pub mod recommendation;

pub use account::{Account, AccountUpdate, NewAccount, Provider};
pub use audit::{ActorType, AuditAction, AuditEvent, NewAuditEvent};
pub use auth::{
    Action, ApiKey, NewUser, Permission, Resource, Role, Session, User, role_has_permission,
    role_permissions,
};
pub use discovery::{
    AgentHealth, ApprovalStatus, BootstrapToken, DiscoveredResource, DiscoveryAgent,
    IncomingResource, ResourceStatus, ResourceType, SyncJob, SyncJobCounters, SyncJobStatus,
    SyncSource,
};
pub use pool::{Block, NewPool, Pool, PoolNode, PoolSource, PoolStats, PoolStatus, PoolType, PoolUpdate};
pub use recommendation::{
    NewRecommendation, Recommendation, RecommendationPriority, RecommendationStatus,
    RecommendationType,
};

/// The default single-tenant organization id, used when no multi-tenant
/// routing is configured.
pub const DEFAULT_ORG_ID: uuid::Uuid = uuid::Uuid::nil();
