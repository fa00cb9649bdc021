use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order_item::PartHealth;

/// Condition categories an incident report can carry. The first three are
/// produced automatically from returned-item health; the repair states are
/// reserved for manually filed reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentState {
    HeavilyUsed,
    Broken,
    Missing,
    MinorRepairRequired,
    MajorRepairRequired,
    NotSureIfWorks,
}

impl IncidentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentState::HeavilyUsed => "Heavily Used",
            IncidentState::Broken => "Broken",
            IncidentState::Missing => "Missing",
            IncidentState::MinorRepairRequired => "Minor Repair Required",
            IncidentState::MajorRepairRequired => "Major Repair Required",
            IncidentState::NotSureIfWorks => "Not Sure If Works",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Heavily Used" => Some(IncidentState::HeavilyUsed),
            "Broken" => Some(IncidentState::Broken),
            "Missing" => Some(IncidentState::Missing),
            "Minor Repair Required" => Some(IncidentState::MinorRepairRequired),
            "Major Repair Required" => Some(IncidentState::MajorRepairRequired),
            "Not Sure If Works" => Some(IncidentState::NotSureIfWorks),
            _ => None,
        }
    }

    /// Incident state a returned-health report maps to. A healthy return
    /// opens no incident. A lost unit is recorded as missing stock.
    pub fn from_health(health: PartHealth) -> Option<Self> {
        match health {
            PartHealth::Healthy => None,
            PartHealth::HeavilyUsed => Some(IncidentState::HeavilyUsed),
            PartHealth::Broken => Some(IncidentState::Broken),
            PartHealth::Lost => Some(IncidentState::Missing),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incidents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_item_id: Uuid,
    pub state: String,
    pub time_occurred: DateTime<Utc>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn state(&self) -> Option<IncidentState> {
        IncidentState::from_str(&self.state)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order_item::Entity",
        from = "Column::OrderItemId",
        to = "super::order_item::Column::Id"
    )]
    OrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_state_strings_round_trip() {
        for state in [
            IncidentState::HeavilyUsed,
            IncidentState::Broken,
            IncidentState::Missing,
            IncidentState::MinorRepairRequired,
            IncidentState::MajorRepairRequired,
            IncidentState::NotSureIfWorks,
        ] {
            assert_eq!(IncidentState::from_str(state.as_str()), Some(state));
        }
    }

    #[test]
    fn health_maps_to_incident_state() {
        assert_eq!(IncidentState::from_health(PartHealth::Healthy), None);
        assert_eq!(
            IncidentState::from_health(PartHealth::HeavilyUsed),
            Some(IncidentState::HeavilyUsed)
        );
        assert_eq!(
            IncidentState::from_health(PartHealth::Broken),
            Some(IncidentState::Broken)
        );
        assert_eq!(
            IncidentState::from_health(PartHealth::Lost),
            Some(IncidentState::Missing)
        );
    }
}
