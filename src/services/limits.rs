use crate::{
    entities::category::{self, Entity as CategoryEntity},
    entities::hardware,
    entities::hardware_category,
    entities::order::{self, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::{LimitScope, ServiceError},
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QuerySelect,
    RelationTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

/// Live units of one hardware item held by one team.
pub async fn team_checked_out(
    conn: &impl ConnectionTrait,
    team_id: Uuid,
    hardware_id: Uuid,
) -> Result<u64, ServiceError> {
    let count = OrderItemEntity::find()
        .join(JoinType::InnerJoin, order_item::Relation::Order.def())
        .filter(order_item::Column::HardwareId.eq(hardware_id))
        .filter(order_item::Column::PartReturnedHealth.is_null())
        .filter(order::Column::Status.is_in(OrderStatus::live_statuses()))
        .filter(order::Column::TeamId.eq(team_id))
        .count(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    Ok(count)
}

/// Live units held by one team across every hardware item in a category.
async fn team_checked_out_in_category(
    conn: &impl ConnectionTrait,
    team_id: Uuid,
    category_id: Uuid,
) -> Result<u64, ServiceError> {
    let count = OrderItemEntity::find()
        .join(JoinType::InnerJoin, order_item::Relation::Order.def())
        .join(JoinType::InnerJoin, order_item::Relation::Hardware.def())
        .join(
            JoinType::InnerJoin,
            hardware::Relation::HardwareCategories.def(),
        )
        .filter(hardware_category::Column::CategoryId.eq(category_id))
        .filter(order_item::Column::PartReturnedHealth.is_null())
        .filter(order::Column::Status.is_in(OrderStatus::live_statuses()))
        .filter(order::Column::TeamId.eq(team_id))
        .count(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    Ok(count)
}

/// Categories of one hardware item that carry a `max_per_team` cap.
/// Uncapped categories never constrain anything and are not fetched.
pub async fn capped_categories(
    conn: &impl ConnectionTrait,
    hardware_id: Uuid,
) -> Result<Vec<category::Model>, ServiceError> {
    let categories = CategoryEntity::find()
        .join(
            JoinType::InnerJoin,
            category::Relation::HardwareCategories.def(),
        )
        .filter(hardware_category::Column::HardwareId.eq(hardware_id))
        .filter(category::Column::MaxPerTeam.is_not_null())
        .all(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    Ok(categories)
}

/// Checks whether `team_id` may take `requested_units` more of one hardware
/// item, against the per-item cap and every capped category the item belongs
/// to. Counts are taken on the caller's connection, so running this inside a
/// transaction evaluates it against that transaction's snapshot.
pub async fn check_headroom(
    conn: &impl ConnectionTrait,
    team_id: Uuid,
    hardware: &hardware::Model,
    requested_units: u32,
) -> Result<(), ServiceError> {
    check_order_headroom(conn, team_id, &[(hardware.clone(), requested_units)]).await
}

/// Order-level limit check: validates a whole set of (hardware, units)
/// requests at once. Per-category demand is summed across every hardware
/// item in the set before comparing against the cap, so a single order
/// spreading units over several items in one capped category cannot slip
/// past the cap line by line. All caps must pass; the first violation
/// rejects the whole set.
pub async fn check_order_headroom(
    conn: &impl ConnectionTrait,
    team_id: Uuid,
    requests: &[(hardware::Model, u32)],
) -> Result<(), ServiceError> {
    // Per-item caps first: cheap, and the error names the exact item.
    for (hardware, units) in requests {
        let Some(limit) = hardware.max_per_team else {
            continue;
        };
        let limit = limit.max(0) as u64;
        let current = team_checked_out(conn, team_id, hardware.id).await?;

        if current + u64::from(*units) > limit {
            return Err(ServiceError::LimitExceeded {
                scope: LimitScope::Hardware(hardware.name.clone()),
                limit: limit as u32,
                current: current as u32,
                requested: *units,
            });
        }
    }

    // Accumulate the order's demand per capped category across all items.
    let mut demand: HashMap<Uuid, (category::Model, u32)> = HashMap::new();
    for (hardware, units) in requests {
        for cat in capped_categories(conn, hardware.id).await? {
            demand
                .entry(cat.id)
                .and_modify(|(_, total)| *total += *units)
                .or_insert((cat, *units));
        }
    }

    for (category_id, (cat, units)) in demand {
        let Some(limit) = cat.max_per_team else {
            continue;
        };
        let limit = limit.max(0) as u64;
        let current = team_checked_out_in_category(conn, team_id, category_id).await?;

        if current + u64::from(units) > limit {
            return Err(ServiceError::LimitExceeded {
                scope: LimitScope::Category(cat.name),
                limit: limit as u32,
                current: current as u32,
                requested: units,
            });
        }
    }

    Ok(())
}

/// How many further units of this hardware the team could still take before
/// hitting a cap. `None` means no cap applies at any level. Display only;
/// allocation decisions go through `check_order_headroom` inside the
/// deciding transaction.
pub async fn headroom(
    conn: &impl ConnectionTrait,
    team_id: Uuid,
    hardware: &hardware::Model,
) -> Result<Option<u64>, ServiceError> {
    let mut tightest: Option<u64> = None;

    if let Some(limit) = hardware.max_per_team {
        let current = team_checked_out(conn, team_id, hardware.id).await?;
        tightest = Some((limit.max(0) as u64).saturating_sub(current));
    }

    for cat in capped_categories(conn, hardware.id).await? {
        let Some(limit) = cat.max_per_team else {
            continue;
        };
        let current = team_checked_out_in_category(conn, team_id, cat.id).await?;
        let left = (limit.max(0) as u64).saturating_sub(current);
        tightest = Some(tightest.map_or(left, |t| t.min(left)));
    }

    Ok(tightest)
}
