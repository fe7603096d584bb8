use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per accepted payment webhook. Rows are only ever inserted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub provider: String,
    pub plan: String,
    #[sea_orm(column_type = "Double")]
    pub amount_sar: f64,
    pub status: String,
    pub started_at: TimeDateTimeWithTimeZone,
    pub expires_at: TimeDateTimeWithTimeZone,
    #[sea_orm(unique)]
    pub provider_reference: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub provider_payload: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
