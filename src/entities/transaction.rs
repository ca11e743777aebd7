use sea_orm::entity::prelude::*;
use chrono::{DateTime, Utc};

/// Append-only ledger row. Rows are inserted once and never updated.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub funding_request_id: Uuid,
    pub amount_minor: Option<i64>,
    pub kind: String,
    pub contributor_id: Option<String>,
    pub borrower_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::funding_request::Entity",
        from = "Column::FundingRequestId",
        to = "super::funding_request::Column::Id"
    )]
    FundingRequest,
}

impl Related<super::funding_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FundingRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
