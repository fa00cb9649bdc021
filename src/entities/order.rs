use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an order. The item set is mutable only while the order is a
/// `Cart`; every later status represents units committed against stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Cart,
    Submitted,
    ReadyForPickup,
    PickedUp,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Cart => "Cart",
            OrderStatus::Submitted => "Submitted",
            OrderStatus::ReadyForPickup => "Ready for Pickup",
            OrderStatus::PickedUp => "Picked Up",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Cart" => Some(OrderStatus::Cart),
            "Submitted" => Some(OrderStatus::Submitted),
            "Ready for Pickup" => Some(OrderStatus::ReadyForPickup),
            "Picked Up" => Some(OrderStatus::PickedUp),
            _ => None,
        }
    }

    /// The single transition table. Orders move strictly forward, one step
    /// at a time; there is no path back to `Cart` and no skipping.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (OrderStatus::Cart, OrderStatus::Submitted)
                | (OrderStatus::Submitted, OrderStatus::ReadyForPickup)
                | (OrderStatus::ReadyForPickup, OrderStatus::PickedUp)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::PickedUp)
    }

    /// Statuses whose un-returned items count against availability. Cart
    /// orders never hold stock; cancellation deletes the cart outright, so
    /// no cancelled status appears here.
    pub fn live_statuses() -> [&'static str; 3] {
        [
            OrderStatus::Submitted.as_str(),
            OrderStatus::ReadyForPickup.as_str(),
            OrderStatus::PickedUp.as_str(),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub team_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<OrderStatus> {
        OrderStatus::from_str(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id"
    )]
    Team,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
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
