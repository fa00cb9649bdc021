use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Condition a physical unit is reported in when it comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartHealth {
    Healthy,
    HeavilyUsed,
    Broken,
    Lost,
}

impl PartHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartHealth::Healthy => "Healthy",
            PartHealth::HeavilyUsed => "Heavily Used",
            PartHealth::Broken => "Broken",
            PartHealth::Lost => "Lost",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Healthy" => Some(PartHealth::Healthy),
            "Heavily Used" => Some(PartHealth::HeavilyUsed),
            "Broken" => Some(PartHealth::Broken),
            "Lost" => Some(PartHealth::Lost),
            _ => None,
        }
    }
}

/// One row per physical unit on an order. `part_returned_health` stays
/// `NULL` while the unit is out; once set, the unit stops counting against
/// availability and the value never changes again.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub hardware_id: Uuid,
    pub part_returned_health: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn returned_health(&self) -> Option<PartHealth> {
        self.part_returned_health
            .as_deref()
            .and_then(PartHealth::from_str)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::hardware::Entity",
        from = "Column::HardwareId",
        to = "super::hardware::Column::Id"
    )]
    Hardware,
    #[sea_orm(has_one = "super::incident::Entity")]
    Incident,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::hardware::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hardware.def()
    }
}

impl Related<super::incident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incident.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);

            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
        }

        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}
