use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recommendations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub org_id: Uuid,
    pub pool_id: Option<i64>,
    pub recommendation_type: String,
    pub status: String,
    pub priority: String,
    pub title: String,
    pub description: String,
    pub suggested_cidr: Option<String>,
    pub rule_id: Option<String>,
    pub score: f64,
    pub metadata: Json,
    pub applied_pool_id: Option<i64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub resolved_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
