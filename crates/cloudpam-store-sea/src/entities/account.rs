use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,
    pub org_id: Uuid,
    pub key: String,
    pub name: String,
    pub provider: String,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub platform: Option<String>,
    pub tier: Option<String>,
    pub environment: Option<String>,
    pub regions: Json,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
