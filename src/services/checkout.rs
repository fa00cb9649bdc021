use crate::{
    db::DbPool,
    entities::hardware::Entity as HardwareEntity,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::team::Entity as TeamEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        ledger::{self, InventoryLedger, StockLevel},
        limits,
        orders::{status_of, OrderService},
        returns::{ReturnItemRequest, ReturnOutcome, ReturnService},
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Manages the mutable phase of an order: one open cart per team, with
/// items added and removed freely and nothing counted against stock until
/// submit.
///
/// Adding takes the team row lock; removal and cancellation take the
/// order row lock. Submission takes both, order row first, so a cart can
/// never change shape while its submission is mid-flight and two callers
/// adding for the same team cannot create two open carts.
#[derive(Clone)]
pub struct CheckoutService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    orders: OrderService,
    returns: ReturnService,
    ledger: InventoryLedger,
}

impl CheckoutService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        orders: OrderService,
        returns: ReturnService,
        ledger: InventoryLedger,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            orders,
            returns,
            ledger,
        }
    }

    /// Adds one unit of a hardware item to the team's open cart, creating
    /// the cart if the team has none.
    ///
    /// The availability and cap checks here are advisory: they stop a team
    /// from building an obviously doomed cart, but hold nothing. Stock in
    /// other teams' carts is still up for grabs, and the authoritative
    /// re-check happens when the order is submitted.
    #[instrument(skip(self), fields(team_id = %team_id, hardware_id = %hardware_id))]
    pub async fn add_to_cart(
        &self,
        team_id: Uuid,
        hardware_id: Uuid,
    ) -> Result<order_item::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start add-to-cart transaction");
            ServiceError::DatabaseError(e)
        })?;

        let team = TeamEntity::find_by_id(team_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Team", team_id))?;

        let hardware = HardwareEntity::find_by_id(hardware_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Hardware", hardware_id))?;

        let cart = match OrderEntity::find()
            .filter(order::Column::TeamId.eq(team.id))
            .filter(order::Column::Status.eq(OrderStatus::Cart.as_str()))
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
        {
            Some(cart) => cart,
            None => {
                let cart = order::ActiveModel {
                    team_id: Set(team.id),
                    status: Set(OrderStatus::Cart.as_str().to_string()),
                    ..Default::default()
                };

                cart.insert(&txn).await.map_err(|e| {
                    error!(error = %e, team_id = %team.id, "Failed to open cart");
                    ServiceError::DatabaseError(e)
                })?
            }
        };

        // What the cart would hold for this hardware after the add; carts
        // themselves never count as checked out.
        let in_cart = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(cart.id))
            .filter(order_item::Column::HardwareId.eq(hardware.id))
            .count(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let requested = in_cart as u32 + 1;
        ledger::reserve(&txn, &hardware, requested).await?;
        limits::check_headroom(&txn, team.id, &hardware, requested).await?;

        let item = order_item::ActiveModel {
            order_id: Set(cart.id),
            hardware_id: Set(hardware.id),
            ..Default::default()
        };

        let item = item.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %cart.id, "Failed to insert cart item");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit add-to-cart transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %cart.id,
            order_item_id = %item.id,
            in_cart = requested,
            "Added item to cart"
        );

        self.event_sender
            .send_or_log(Event::ItemAddedToCart {
                order_id: cart.id,
                order_item_id: item.id,
                hardware_id: hardware.id,
            })
            .await;

        Ok(item)
    }

    /// Removes a line item from its cart. Refused once the owning order has
    /// left the `Cart` status; committed units only come back via returns.
    #[instrument(skip(self), fields(order_item_id = %order_item_id))]
    pub async fn remove_from_cart(&self, order_item_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start remove-from-cart transaction");
            ServiceError::DatabaseError(e)
        })?;

        // Unlocked peek to learn the owning order. The order row lock below
        // is the authority; the item is re-read under it.
        let item = OrderItemEntity::find_by_id(order_item_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or(ServiceError::NotInCart(order_item_id))?;

        let order = OrderEntity::find_by_id(item.order_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or(ServiceError::NotInCart(order_item_id))?;

        if status_of(&order)? != OrderStatus::Cart {
            return Err(ServiceError::NotInCart(order_item_id));
        }

        let item = OrderItemEntity::find_by_id(order_item_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or(ServiceError::NotInCart(order_item_id))?;

        let order_id = item.order_id;
        item.delete(&txn).await.map_err(|e| {
            error!(error = %e, order_item_id = %order_item_id, "Failed to delete cart item");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit remove-from-cart transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, order_item_id = %order_item_id, "Removed item from cart");

        self.event_sender
            .send_or_log(Event::ItemRemovedFromCart {
                order_id,
                order_item_id,
            })
            .await;

        Ok(())
    }

    /// Cancels an open cart by deleting it and its items. There is no
    /// cancelled status: a cart held nothing, so nothing needs releasing,
    /// and the order row simply disappears. Orders past `Cart` cannot be
    /// cancelled.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_cart(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start cancel-cart transaction");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;

        // Team lock second, same order as submission.
        TeamEntity::find_by_id(order.team_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Team", order.team_id))?;

        let status = status_of(&order)?;
        if status != OrderStatus::Cart {
            return Err(ServiceError::InvalidTransition {
                from: status,
                to: OrderStatus::Cart,
            });
        }

        let team_id = order.team_id;

        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to delete cart items");
                ServiceError::DatabaseError(e)
            })?;

        order.delete(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to delete cart");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit cancel-cart transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, team_id = %team_id, "Cancelled cart");

        self.event_sender
            .send_or_log(Event::CartCancelled { order_id, team_id })
            .await;

        Ok(())
    }

    /// Submits the team's cart, committing its units against stock. See
    /// `OrderService::submit` for the transaction this runs.
    pub async fn submit_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        self.orders.submit(order_id).await
    }

    /// Processes a returned unit. See `ReturnService::return_item`.
    pub async fn return_item(
        &self,
        request: ReturnItemRequest,
    ) -> Result<ReturnOutcome, ServiceError> {
        self.returns.return_item(request).await
    }

    /// Current stock level for one hardware item.
    pub async fn remaining(&self, hardware_id: Uuid) -> Result<StockLevel, ServiceError> {
        self.ledger.remaining(hardware_id).await
    }

    /// The team's open cart and its items, if the team has one.
    #[instrument(skip(self), fields(team_id = %team_id))]
    pub async fn open_cart(
        &self,
        team_id: Uuid,
    ) -> Result<Option<(order::Model, Vec<order_item::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        let cart = OrderEntity::find()
            .filter(order::Column::TeamId.eq(team_id))
            .filter(order::Column::Status.eq(OrderStatus::Cart.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let cart = match cart {
            Some(cart) => cart,
            None => return Ok(None),
        };

        let items = cart
            .find_related(OrderItemEntity)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(Some((cart, items)))
    }

    /// How many more units of a hardware item the team could still check
    /// out before a per-item or category cap stops it. `None` means no cap
    /// applies. Advisory, like everything read outside a submission.
    #[instrument(skip(self), fields(team_id = %team_id, hardware_id = %hardware_id))]
    pub async fn team_headroom(
        &self,
        team_id: Uuid,
        hardware_id: Uuid,
    ) -> Result<Option<u64>, ServiceError> {
        let db = &*self.db_pool;

        let hardware = HardwareEntity::find_by_id(hardware_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Hardware", hardware_id))?;

        limits::headroom(db, team_id, &hardware).await
    }
}
