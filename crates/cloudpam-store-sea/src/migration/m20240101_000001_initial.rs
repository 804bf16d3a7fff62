use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SchemaInfo::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SchemaInfo::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(SchemaInfo::CurrentVersion).string().not_null())
                    .col(ColumnDef::new(SchemaInfo::AppVersion).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).big_integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Accounts::OrgId).uuid().not_null())
                    .col(ColumnDef::new(Accounts::Key).string().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Provider).string().not_null())
                    .col(ColumnDef::new(Accounts::ExternalId).string())
                    .col(ColumnDef::new(Accounts::Description).string())
                    .col(ColumnDef::new(Accounts::Platform).string())
                    .col(ColumnDef::new(Accounts::Tier).string())
                    .col(ColumnDef::new(Accounts::Environment).string())
                    .col(ColumnDef::new(Accounts::Regions).json().not_null())
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Accounts::DeletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_org_key")
                    .table(Accounts::Table)
                    .col(Accounts::OrgId)
                    .col(Accounts::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Pools::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pools::Id).big_integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Pools::OrgId).uuid().not_null())
                    .col(ColumnDef::new(Pools::Name).string().not_null())
                    .col(ColumnDef::new(Pools::Cidr).string().not_null())
                    .col(ColumnDef::new(Pools::ParentId).big_integer())
                    .col(ColumnDef::new(Pools::AccountId).big_integer())
                    .col(ColumnDef::new(Pools::PoolType).string().not_null())
                    .col(ColumnDef::new(Pools::Status).string().not_null())
                    .col(ColumnDef::new(Pools::Source).string().not_null())
                    .col(ColumnDef::new(Pools::Description).string())
                    .col(ColumnDef::new(Pools::Tags).json().not_null())
                    .col(ColumnDef::new(Pools::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Pools::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Pools::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pools_account")
                            .from(Pools::Table, Pools::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_pools_org_parent")
                    .table(Pools::Table)
                    .col(Pools::OrgId)
                    .col(Pools::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DiscoveredResources::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DiscoveredResources::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(DiscoveredResources::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(DiscoveredResources::Provider).string().not_null())
                    .col(ColumnDef::new(DiscoveredResources::Region).string().not_null())
                    .col(ColumnDef::new(DiscoveredResources::ResourceType).string().not_null())
                    .col(ColumnDef::new(DiscoveredResources::ResourceId).string().not_null())
                    .col(ColumnDef::new(DiscoveredResources::Name).string())
                    .col(ColumnDef::new(DiscoveredResources::Cidr).string())
                    .col(ColumnDef::new(DiscoveredResources::ParentResourceId).string())
                    .col(ColumnDef::new(DiscoveredResources::LinkedPoolId).big_integer())
                    .col(ColumnDef::new(DiscoveredResources::Status).string().not_null())
                    .col(ColumnDef::new(DiscoveredResources::Metadata).json().not_null())
                    .col(ColumnDef::new(DiscoveredResources::DiscoveredAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(DiscoveredResources::LastSeenAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_resources_account_identity")
                    .table(DiscoveredResources::Table)
                    .col(DiscoveredResources::AccountId)
                    .col(DiscoveredResources::Provider)
                    .col(DiscoveredResources::ResourceType)
                    .col(DiscoveredResources::ResourceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SyncJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncJobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncJobs::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(SyncJobs::Status).string().not_null())
                    .col(ColumnDef::new(SyncJobs::Source).string().not_null())
                    .col(ColumnDef::new(SyncJobs::AgentId).uuid())
                    .col(ColumnDef::new(SyncJobs::StartedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(SyncJobs::FinishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SyncJobs::Found).integer().not_null())
                    .col(ColumnDef::new(SyncJobs::Created).integer().not_null())
                    .col(ColumnDef::new(SyncJobs::Updated).integer().not_null())
                    .col(ColumnDef::new(SyncJobs::Deleted).integer().not_null())
                    .col(ColumnDef::new(SyncJobs::Error).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DiscoveryAgents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DiscoveryAgents::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(DiscoveryAgents::Name).string().not_null())
                    .col(ColumnDef::new(DiscoveryAgents::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(DiscoveryAgents::ApiKeyId).uuid())
                    .col(ColumnDef::new(DiscoveryAgents::ApprovalStatus).string().not_null())
                    .col(ColumnDef::new(DiscoveryAgents::BootstrapTokenId).uuid().not_null())
                    .col(ColumnDef::new(DiscoveryAgents::Version).string().not_null())
                    .col(ColumnDef::new(DiscoveryAgents::Hostname).string().not_null())
                    .col(ColumnDef::new(DiscoveryAgents::LastSeenAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(DiscoveryAgents::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DiscoveryAgents::ApprovedBy).uuid())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BootstrapTokens::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BootstrapTokens::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(BootstrapTokens::Name).string().not_null())
                    .col(ColumnDef::new(BootstrapTokens::TokenHash).string().not_null())
                    .col(ColumnDef::new(BootstrapTokens::AccountId).big_integer())
                    .col(ColumnDef::new(BootstrapTokens::CreatedBy).uuid())
                    .col(ColumnDef::new(BootstrapTokens::ExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(BootstrapTokens::Revoked).boolean().not_null())
                    .col(ColumnDef::new(BootstrapTokens::UsedCount).integer().not_null())
                    .col(ColumnDef::new(BootstrapTokens::MaxUses).integer())
                    .col(ColumnDef::new(BootstrapTokens::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_bootstrap_tokens_hash")
                    .table(BootstrapTokens::Table)
                    .col(BootstrapTokens::TokenHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditEvents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuditEvents::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AuditEvents::OrgId).uuid().not_null())
                    .col(ColumnDef::new(AuditEvents::ActorType).string().not_null())
                    .col(ColumnDef::new(AuditEvents::ActorId).uuid())
                    .col(ColumnDef::new(AuditEvents::ActorLabel).string())
                    .col(ColumnDef::new(AuditEvents::Action).string().not_null())
                    .col(ColumnDef::new(AuditEvents::ResourceType).string().not_null())
                    .col(ColumnDef::new(AuditEvents::ResourceId).string().not_null())
                    .col(ColumnDef::new(AuditEvents::Before).json())
                    .col(ColumnDef::new(AuditEvents::After).json())
                    .col(ColumnDef::new(AuditEvents::Ip).string())
                    .col(ColumnDef::new(AuditEvents::UserAgent).string())
                    .col(ColumnDef::new(AuditEvents::RequestId).string())
                    .col(ColumnDef::new(AuditEvents::Metadata).json().not_null())
                    .col(ColumnDef::new(AuditEvents::OccurredAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_audit_org_occurred")
                    .table(AuditEvents::Table)
                    .col(AuditEvents::OrgId)
                    .col(AuditEvents::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::OrgId).uuid().not_null())
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Active).boolean().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_users_org_username")
                    .table(Users::Table)
                    .col(Users::OrgId)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sessions::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Sessions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Sessions::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Sessions::ExpiresAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Sessions::LastUsedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Sessions::Ip).string())
                    .col(ColumnDef::new(Sessions::UserAgent).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApiKeys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ApiKeys::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ApiKeys::OrgId).uuid().not_null())
                    .col(ColumnDef::new(ApiKeys::Name).string().not_null())
                    .col(ColumnDef::new(ApiKeys::Prefix).string().not_null())
                    .col(ColumnDef::new(ApiKeys::SecretHash).string().not_null())
                    .col(ColumnDef::new(ApiKeys::Scopes).json().not_null())
                    .col(ColumnDef::new(ApiKeys::CreatedBy).uuid())
                    .col(ColumnDef::new(ApiKeys::ExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ApiKeys::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(ApiKeys::LastUsedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ApiKeys::Revoked).boolean().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_api_keys_prefix")
                    .table(ApiKeys::Table)
                    .col(ApiKeys::Prefix)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Recommendations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Recommendations::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Recommendations::OrgId).uuid().not_null())
                    .col(ColumnDef::new(Recommendations::PoolId).big_integer())
                    .col(ColumnDef::new(Recommendations::RecommendationType).string().not_null())
                    .col(ColumnDef::new(Recommendations::Status).string().not_null())
                    .col(ColumnDef::new(Recommendations::Priority).string().not_null())
                    .col(ColumnDef::new(Recommendations::Title).string().not_null())
                    .col(ColumnDef::new(Recommendations::Description).string().not_null())
                    .col(ColumnDef::new(Recommendations::SuggestedCidr).string())
                    .col(ColumnDef::new(Recommendations::RuleId).string())
                    .col(ColumnDef::new(Recommendations::Score).double().not_null())
                    .col(ColumnDef::new(Recommendations::Metadata).json().not_null())
                    .col(ColumnDef::new(Recommendations::AppliedPoolId).big_integer())
                    .col(ColumnDef::new(Recommendations::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Recommendations::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Recommendations::ResolvedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Recommendations::Table.into_iden(),
            ApiKeys::Table.into_iden(),
            Sessions::Table.into_iden(),
            Users::Table.into_iden(),
            AuditEvents::Table.into_iden(),
            BootstrapTokens::Table.into_iden(),
            DiscoveryAgents::Table.into_iden(),
            SyncJobs::Table.into_iden(),
            DiscoveredResources::Table.into_iden(),
            Pools::Table.into_iden(),
            Accounts::Table.into_iden(),
            SchemaInfo::Table.into_iden(),
        ] {
            manager.drop_table(Table::drop().table(table).if_exists().to_owned()).await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum SchemaInfo {
    Table,
    Id,
    CurrentVersion,
    AppVersion,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    OrgId,
    Key,
    Name,
    Provider,
    ExternalId,
    Description,
    Platform,
    Tier,
    Environment,
    Regions,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Pools {
    Table,
    Id,
    OrgId,
    Name,
    Cidr,
    ParentId,
    AccountId,
    PoolType,
    Status,
    Source,
    Description,
    Tags,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum DiscoveredResources {
    Table,
    Id,
    AccountId,
    Provider,
    Region,
    ResourceType,
    ResourceId,
    Name,
    Cidr,
    ParentResourceId,
    LinkedPoolId,
    Status,
    Metadata,
    DiscoveredAt,
    LastSeenAt,
}

#[derive(DeriveIden)]
enum SyncJobs {
    Table,
    Id,
    AccountId,
    Status,
    Source,
    AgentId,
    StartedAt,
    FinishedAt,
    Found,
    Created,
    Updated,
    Deleted,
    Error,
}

#[derive(DeriveIden)]
enum DiscoveryAgents {
    Table,
    Id,
    Name,
    AccountId,
    ApiKeyId,
    ApprovalStatus,
    BootstrapTokenId,
    Version,
    Hostname,
    LastSeenAt,
    ApprovedAt,
    ApprovedBy,
}

#[derive(DeriveIden)]
enum BootstrapTokens {
    Table,
    Id,
    Name,
    TokenHash,
    AccountId,
    CreatedBy,
    ExpiresAt,
    Revoked,
    UsedCount,
    MaxUses,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuditEvents {
    Table,
    Id,
    OrgId,
    ActorType,
    ActorId,
    ActorLabel,
    Action,
    ResourceType,
    ResourceId,
    Before,
    After,
    Ip,
    UserAgent,
    RequestId,
    Metadata,
    OccurredAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    OrgId,
    Username,
    Email,
    DisplayName,
    Role,
    PasswordHash,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    UserId,
    CreatedAt,
    ExpiresAt,
    LastUsedAt,
    Ip,
    UserAgent,
}

#[derive(DeriveIden)]
enum ApiKeys {
    Table,
    Id,
    OrgId,
    Name,
    Prefix,
    SecretHash,
    Scopes,
    CreatedBy,
    ExpiresAt,
    CreatedAt,
    LastUsedAt,
    Revoked,
}

#[derive(DeriveIden)]
enum Recommendations {
    Table,
    Id,
    OrgId,
    PoolId,
    RecommendationType,
    Status,
    Priority,
    Title,
    Description,
    SuggestedCidr,
    RuleId,
    Score,
    Metadata,
    AppliedPoolId,
    CreatedAt,
    UpdatedAt,
    ResolvedAt,
}
