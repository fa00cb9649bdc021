use crate::{
    db::DbPool,
    entities::hardware::{self, Entity as HardwareEntity},
    entities::order::{self, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Display-facing stock figures for one hardware item. Derived on demand;
/// never consulted for allocation decisions, which recompute inside their
/// own transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevel {
    pub hardware_id: Uuid,
    pub name: String,
    pub quantity_available: i32,
    pub quantity_checked_out: u64,
    pub quantity_remaining: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StockLevelListResponse {
    pub levels: Vec<StockLevel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Receipt for an admitted reservation. Holding one means the availability
/// check passed inside the caller's transaction; the caller makes it
/// durable by flipping the order status before committing.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub hardware_id: Uuid,
    pub units: u32,
}

#[derive(FromQueryResult)]
struct CheckedOutRow {
    hardware_id: Uuid,
    checked_out: i64,
}

/// Counts the live units of one hardware item: line items whose order has
/// been submitted (or later) and which have not come back yet. Cart items
/// never count.
pub async fn checked_out(
    conn: &impl ConnectionTrait,
    hardware_id: Uuid,
) -> Result<u64, ServiceError> {
    let count = OrderItemEntity::find()
        .join(JoinType::InnerJoin, order_item::Relation::Order.def())
        .filter(order_item::Column::HardwareId.eq(hardware_id))
        .filter(order_item::Column::PartReturnedHealth.is_null())
        .filter(order::Column::Status.is_in(OrderStatus::live_statuses()))
        .count(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    Ok(count)
}

/// Admits `units` of new commitment against `hardware`, or fails with
/// `InsufficientStock`. Must run inside the transaction that will also make
/// the commitment durable; serialization against concurrent reservations
/// comes from the row locks the caller holds.
pub async fn reserve(
    conn: &impl ConnectionTrait,
    hardware: &hardware::Model,
    units: u32,
) -> Result<Reservation, ServiceError> {
    let committed = checked_out(conn, hardware.id).await?;
    let remaining = i64::from(hardware.quantity_available) - committed as i64;

    if i64::from(units) > remaining {
        return Err(ServiceError::InsufficientStock {
            hardware_id: hardware.id,
            requested: units,
            remaining: remaining.max(0) as u32,
        });
    }

    Ok(Reservation {
        hardware_id: hardware.id,
        units,
    })
}

/// Asserts that releasing `units` of commitment is accounted for; fails
/// with `OverRelease` rather than silently clamping. The caller drops the
/// units out of the live set (by writing the returned health) in the same
/// transaction.
pub async fn release(
    conn: &impl ConnectionTrait,
    hardware_id: Uuid,
    units: u32,
) -> Result<(), ServiceError> {
    let committed = checked_out(conn, hardware_id).await?;

    if u64::from(units) > committed {
        return Err(ServiceError::OverRelease {
            hardware_id,
            requested: units,
            committed: committed.min(u64::from(u32::MAX)) as u32,
        });
    }

    Ok(())
}

/// Permanently removes `units` from physical stock, for units reported lost
/// or destroyed. Stock never goes below zero.
pub async fn retire(
    conn: &impl ConnectionTrait,
    hardware_id: Uuid,
    units: u32,
) -> Result<(), ServiceError> {
    let hardware = HardwareEntity::find_by_id(hardware_id)
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)?
        .ok_or_else(|| ServiceError::not_found("Hardware", hardware_id))?;

    if i64::from(hardware.quantity_available) < i64::from(units) {
        return Err(ServiceError::OverRelease {
            hardware_id,
            requested: units,
            committed: hardware.quantity_available.max(0) as u32,
        });
    }

    let remaining_stock = (i64::from(hardware.quantity_available) - i64::from(units)) as i32;
    let mut active: hardware::ActiveModel = hardware.into();
    active.quantity_available = Set(remaining_stock);
    active.update(conn).await.map_err(ServiceError::DatabaseError)?;

    info!(
        hardware_id = %hardware_id,
        units = units,
        remaining_stock = remaining_stock,
        "Retired hardware stock"
    );

    Ok(())
}

/// Read API over derived availability.
#[derive(Clone)]
pub struct InventoryLedger {
    db: Arc<DbPool>,
}

impl InventoryLedger {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Computes the current stock level for one hardware item.
    #[instrument(skip(self), fields(hardware_id = %hardware_id))]
    pub async fn remaining(&self, hardware_id: Uuid) -> Result<StockLevel, ServiceError> {
        let db = &*self.db;

        let hardware = HardwareEntity::find_by_id(hardware_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Hardware", hardware_id))?;

        let committed = checked_out(db, hardware_id).await?;

        Ok(stock_level(&hardware, committed))
    }

    /// Lists stock levels, page by page, for display surfaces.
    #[instrument(skip(self))]
    pub async fn stock_levels(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<StockLevelListResponse, ServiceError> {
        let db = &*self.db;

        let paginator = HardwareEntity::find()
            .order_by_asc(hardware::Column::Name)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count hardware");
            ServiceError::DatabaseError(e)
        })?;

        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(error = %e, page = page, per_page = per_page, "Failed to fetch hardware page");
                ServiceError::DatabaseError(e)
            })?;

        let ids: Vec<Uuid> = items.iter().map(|h| h.id).collect();
        let counts = checked_out_for(db, &ids).await?;

        let levels = items
            .iter()
            .map(|h| stock_level(h, counts.get(&h.id).copied().unwrap_or(0)))
            .collect();

        Ok(StockLevelListResponse {
            levels,
            total,
            page,
            per_page,
        })
    }
}

/// Grouped live-unit counts for a set of hardware ids, one query.
async fn checked_out_for(
    conn: &impl ConnectionTrait,
    hardware_ids: &[Uuid],
) -> Result<HashMap<Uuid, u64>, ServiceError> {
    if hardware_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<CheckedOutRow> = OrderItemEntity::find()
        .select_only()
        .column(order_item::Column::HardwareId)
        .column_as(order_item::Column::Id.count(), "checked_out")
        .join(JoinType::InnerJoin, order_item::Relation::Order.def())
        .filter(order_item::Column::HardwareId.is_in(hardware_ids.to_vec()))
        .filter(order_item::Column::PartReturnedHealth.is_null())
        .filter(order::Column::Status.is_in(OrderStatus::live_statuses()))
        .group_by(order_item::Column::HardwareId)
        .into_model::<CheckedOutRow>()
        .all(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    Ok(rows
        .into_iter()
        .map(|r| (r.hardware_id, r.checked_out.max(0) as u64))
        .collect())
}

fn stock_level(hardware: &hardware::Model, committed: u64) -> StockLevel {
    StockLevel {
        hardware_id: hardware.id,
        name: hardware.name.clone(),
        quantity_available: hardware.quantity_available,
        quantity_checked_out: committed,
        quantity_remaining: i64::from(hardware.quantity_available) - committed as i64,
    }
}
