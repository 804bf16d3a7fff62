use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "discovered_resources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: i64,
    pub provider: String,
    pub region: String,
    pub resource_type: String,
    pub resource_id: String,
    pub name: Option<String>,
    pub cidr: Option<String>,
    pub parent_resource_id: Option<String>,
    pub linked_pool_id: Option<i64>,
    pub status: String,
    pub metadata: Json,
    pub discovered_at: DateTimeUtc,
    pub last_seen_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
