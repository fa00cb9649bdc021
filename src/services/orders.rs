use crate::{
    db::DbPool,
    entities::hardware::Entity as HardwareEntity,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::team::Entity as TeamEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{error_label, ORDER_SUBMISSIONS, ORDER_SUBMISSION_FAILURES, UNITS_COMMITTED},
    services::{ledger, limits},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Parses an order's stored status. An unrecognized string is data
/// corruption, not a domain error.
pub(crate) fn status_of(order: &order::Model) -> Result<OrderStatus, ServiceError> {
    order.status().ok_or_else(|| {
        ServiceError::internal(format!(
            "Order {} has unrecognized status '{}'",
            order.id, order.status
        ))
    })
}

/// Drives orders through their lifecycle. Submission is the only step with
/// inventory effect: it re-validates every line item against availability
/// and team limits in one transaction and flips the order to `Submitted`,
/// making the commitment durable.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Submits a cart order. Every line item is validated against stock and
    /// team limits inside a single transaction; any failure rolls the whole
    /// submission back with no partial state.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn submit(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        match self.submit_in_txn(order_id).await {
            Ok((order, units)) => {
                ORDER_SUBMISSIONS.inc();
                UNITS_COMMITTED.inc_by(u64::from(units));

                info!(
                    order_id = %order.id,
                    team_id = %order.team_id,
                    units = units,
                    "Order submitted"
                );

                self.event_sender
                    .send_or_log(Event::OrderSubmitted {
                        order_id: order.id,
                        team_id: order.team_id,
                        units,
                    })
                    .await;

                Ok(order)
            }
            Err(e) => {
                ORDER_SUBMISSION_FAILURES
                    .with_label_values(&[error_label(&e)])
                    .inc();
                Err(e)
            }
        }
    }

    async fn submit_in_txn(&self, order_id: Uuid) -> Result<(order::Model, u32), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start submission transaction");
            ServiceError::DatabaseError(e)
        })?;

        // Writers acquire locks along a fixed hierarchy: order row, then
        // team row, then hardware rows in ascending id order.
        let order = OrderEntity::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;

        let status = status_of(&order)?;
        if status != OrderStatus::Cart {
            return Err(ServiceError::InvalidTransition {
                from: status,
                to: OrderStatus::Submitted,
            });
        }

        // The team lock serializes submission against concurrent cart
        // mutations; an item added after this point lands in a fresh cart.
        TeamEntity::find_by_id(order.team_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Team", order.team_id))?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if items.is_empty() {
            return Err(ServiceError::EmptyOrder(order_id));
        }

        // One row per unit; fold the cart into per-hardware unit counts.
        let mut units_by_hardware: BTreeMap<Uuid, u32> = BTreeMap::new();
        for item in &items {
            *units_by_hardware.entry(item.hardware_id).or_insert(0) += 1;
        }

        let mut request = Vec::with_capacity(units_by_hardware.len());
        for (&hardware_id, &units) in &units_by_hardware {
            let hardware = HardwareEntity::find_by_id(hardware_id)
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| ServiceError::not_found("Hardware", hardware_id))?;

            // Availability is recomputed behind the row lock. The cart's own
            // items are not yet live, so this admits exactly the units that
            // submission will commit.
            ledger::reserve(&txn, &hardware, units).await?;
            request.push((hardware, units));
        }

        limits::check_order_headroom(&txn, order.team_id, &request).await?;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Submitted.as_str().to_string());
        let order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to flip order to Submitted");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit submission transaction");
            ServiceError::DatabaseError(e)
        })?;

        Ok((order, items.len() as u32))
    }

    /// Marks a submitted order as ready for pickup. No inventory effect.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn mark_ready(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = self
            .transition(order_id, OrderStatus::ReadyForPickup)
            .await?;

        self.event_sender
            .send_or_log(Event::OrderReadyForPickup(order_id))
            .await;

        Ok(order)
    }

    /// Marks a ready order as picked up, the terminal state. No inventory
    /// effect; the units were committed at submission.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn pick_up(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = self.transition(order_id, OrderStatus::PickedUp).await?;

        self.event_sender
            .send_or_log(Event::OrderPickedUp(order_id))
            .await;

        Ok(order)
    }

    /// Guarded single-step transition. Illegal requests fail with
    /// `InvalidTransition` and mutate nothing.
    async fn transition(
        &self,
        order_id: Uuid,
        to: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transition transaction");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;

        let from = status_of(&order)?;
        if !from.can_transition(to) {
            return Err(ServiceError::InvalidTransition { from, to });
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(to.as_str().to_string());
        let order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit transition transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            from = from.as_str(),
            to = to.as_str(),
            "Order status updated"
        );

        Ok(order)
    }

    /// Retrieves an order by id.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError> {
        let db = &*self.db_pool;

        OrderEntity::find_by_id(order_id).one(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to fetch order");
            ServiceError::DatabaseError(e)
        })
    }

    /// Retrieves an order together with its line items.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<Option<(order::Model, Vec<order_item::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        let Some(order) = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
        else {
            return Ok(None);
        };

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(Some((order, items)))
    }

    /// Lists a team's orders, newest first, with pagination.
    #[instrument(skip(self), fields(team_id = %team_id))]
    pub async fn list_orders_for_team(
        &self,
        team_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = OrderEntity::find()
            .filter(order::Column::TeamId.eq(team_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, team_id = %team_id, "Failed to count orders");
            ServiceError::DatabaseError(e)
        })?;

        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(error = %e, page = page, per_page = per_page, "Failed to fetch orders page");
                ServiceError::DatabaseError(e)
            })?;

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }
}
