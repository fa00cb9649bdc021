use crate::{
    db::DbPool,
    entities::hardware::Entity as HardwareEntity,
    entities::incident::{self, Entity as IncidentEntity, IncidentState},
    entities::order::{Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity, PartHealth},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ITEMS_RETURNED,
    services::{ledger, orders::status_of},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReturnItemRequest {
    pub order_item_id: Uuid,
    pub health: PartHealth,
    /// Free-text condition notes, recorded on the incident when one opens.
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
    /// When the return was reported. Defaults to now.
    pub time_occurred: Option<DateTime<Utc>>,
}

impl ReturnItemRequest {
    pub fn new(order_item_id: Uuid, health: PartHealth) -> Self {
        Self {
            order_item_id,
            health,
            description: None,
            time_occurred: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnOutcome {
    pub order_item: order_item::Model,
    pub incident: Option<incident::Model>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IncidentListResponse {
    pub incidents: Vec<incident::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Reconciles returned units back into availability. Writing the returned
/// health drops the unit out of the live set, which is what frees the
/// commitment; a non-healthy return additionally opens an incident.
#[derive(Clone)]
pub struct ReturnService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    /// When set, Broken and Lost returns also permanently remove the unit
    /// from physical stock instead of letting it re-enter circulation.
    retire_lost_stock: bool,
}

impl ReturnService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, retire_lost_stock: bool) -> Self {
        Self {
            db_pool,
            event_sender,
            retire_lost_stock,
        }
    }

    /// Processes the return of one physical unit. The owning order must have
    /// been handed out (Ready for Pickup or Picked Up) and the unit must not
    /// have been returned before; the health write and any incident are one
    /// transaction.
    #[instrument(skip(self, request), fields(order_item_id = %request.order_item_id, health = request.health.as_str()))]
    pub async fn return_item(
        &self,
        request: ReturnItemRequest,
    ) -> Result<ReturnOutcome, ServiceError> {
        request.validate()?;

        let health = request.health;
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start return transaction");
            ServiceError::DatabaseError(e)
        })?;

        // The item row lock serializes double returns; the loser re-reads a
        // row that already carries a health value.
        let item = OrderItemEntity::find_by_id(request.order_item_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Order item", request.order_item_id))?;

        if item.part_returned_health.is_some() {
            return Err(ServiceError::AlreadyReturned(item.id));
        }

        let order = OrderEntity::find_by_id(item.order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Order", item.order_id))?;

        let status = status_of(&order)?;
        if !matches!(
            status,
            OrderStatus::ReadyForPickup | OrderStatus::PickedUp
        ) {
            return Err(ServiceError::NotCheckedOut { status });
        }

        let hardware = HardwareEntity::find_by_id(item.hardware_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Hardware", item.hardware_id))?;

        // Commitment sanity assertion: a live item implies at least one
        // committed unit. Failing here means the ledger derivation and the
        // line items disagree, and the transaction must not proceed.
        ledger::release(&txn, hardware.id, 1).await?;

        let mut active: order_item::ActiveModel = item.into();
        active.part_returned_health = Set(Some(health.as_str().to_string()));
        let item = active.update(&txn).await.map_err(|e| {
            error!(error = %e, "Failed to record returned health");
            ServiceError::DatabaseError(e)
        })?;

        let incident = match IncidentState::from_health(health) {
            Some(state) => {
                let incident = incident::ActiveModel {
                    order_item_id: Set(item.id),
                    state: Set(state.as_str().to_string()),
                    time_occurred: Set(request.time_occurred.unwrap_or_else(Utc::now)),
                    description: Set(request.description.clone().unwrap_or_default()),
                    ..Default::default()
                };

                Some(incident.insert(&txn).await.map_err(|e| {
                    error!(error = %e, order_item_id = %item.id, "Failed to open incident");
                    ServiceError::DatabaseError(e)
                })?)
            }
            None => None,
        };

        if self.retire_lost_stock && matches!(health, PartHealth::Broken | PartHealth::Lost) {
            ledger::retire(&txn, hardware.id, 1).await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit return transaction");
            ServiceError::DatabaseError(e)
        })?;

        ITEMS_RETURNED.with_label_values(&[health.as_str()]).inc();

        info!(
            order_item_id = %item.id,
            hardware_id = %item.hardware_id,
            health = health.as_str(),
            incident = incident.is_some(),
            "Item returned"
        );

        self.event_sender
            .send_or_log(Event::ItemReturned {
                order_item_id: item.id,
                hardware_id: item.hardware_id,
                health: health.as_str().to_string(),
            })
            .await;

        if let Some(incident) = &incident {
            warn!(
                incident_id = %incident.id,
                order_item_id = %item.id,
                state = %incident.state,
                "Incident opened for returned item"
            );

            self.event_sender
                .send_or_log(Event::IncidentOpened {
                    incident_id: incident.id,
                    order_item_id: item.id,
                    state: incident.state.clone(),
                })
                .await;
        }

        Ok(ReturnOutcome {
            order_item: item,
            incident,
        })
    }

    /// The incident opened for a line item, if any.
    #[instrument(skip(self), fields(order_item_id = %order_item_id))]
    pub async fn incident_for_item(
        &self,
        order_item_id: Uuid,
    ) -> Result<Option<incident::Model>, ServiceError> {
        let db = &*self.db_pool;

        let item = OrderItemEntity::find_by_id(order_item_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Order item", order_item_id))?;

        item.find_related(IncidentEntity)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Lists incidents, most recent occurrence first, with pagination.
    #[instrument(skip(self))]
    pub async fn list_incidents(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<IncidentListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = IncidentEntity::find()
            .order_by_desc(incident::Column::TimeOccurred)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count incidents");
            ServiceError::DatabaseError(e)
        })?;

        let incidents = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(error = %e, page = page, per_page = per_page, "Failed to fetch incidents page");
                ServiceError::DatabaseError(e)
            })?;

        Ok(IncidentListResponse {
            incidents,
            total,
            page,
            per_page,
        })
    }
}
