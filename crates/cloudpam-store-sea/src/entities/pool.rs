use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "pools")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,
    pub org_id: Uuid,
    pub name: String,
    /// Canonical `a.b.c.d/n` text form. Native prefix types are used by the
    /// relational backend's query layer (overlap/contains predicates), not
    /// as the storage column type, to keep one schema across backends.
    pub cidr: String,
    pub parent_id: Option<i64>,
    pub account_id: Option<i64>,
    pub pool_type: String,
    pub status: String,
    pub source: String,
    pub description: Option<String>,
    pub tags: Json,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl ActiveModelBehavior for ActiveModel {}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}
