use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Handle the services emit through. Events are observational: they fire
/// after the owning transaction commits, and losing one never fails the
/// operation that produced it.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Like [`send`](Self::send), but logs a dropped event instead of
    /// surfacing the error.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Event delivery failed: {}", e);
        }
    }
}

/// Everything worth announcing about carts, orders, and returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order lifecycle
    OrderSubmitted {
        order_id: Uuid,
        team_id: Uuid,
        units: u32,
    },
    OrderReadyForPickup(Uuid),
    OrderPickedUp(Uuid),

    // Cart edits
    ItemAddedToCart {
        order_id: Uuid,
        order_item_id: Uuid,
        hardware_id: Uuid,
    },
    ItemRemovedFromCart {
        order_id: Uuid,
        order_item_id: Uuid,
    },
    CartCancelled {
        order_id: Uuid,
        team_id: Uuid,
    },

    // Reconciliation
    ItemReturned {
        order_item_id: Uuid,
        hardware_id: Uuid,
        health: String,
    },
    IncidentOpened {
        incident_id: Uuid,
        order_item_id: Uuid,
        state: String,
    },
}

/// Drains the event channel and logs what happened. The allocation and
/// lifecycle logic never waits on this loop; a crashed consumer costs
/// log lines, not correctness.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderSubmitted {
                order_id,
                team_id,
                units,
            } => {
                info!(order_id = %order_id, team_id = %team_id, units, "Order submitted");
            }
            Event::OrderReadyForPickup(order_id) => {
                info!(order_id = %order_id, "Order ready for pickup");
            }
            Event::OrderPickedUp(order_id) => {
                info!(order_id = %order_id, "Order picked up");
            }
            Event::ItemAddedToCart {
                order_id,
                order_item_id,
                hardware_id,
            } => {
                debug!(
                    order_id = %order_id,
                    order_item_id = %order_item_id,
                    hardware_id = %hardware_id,
                    "Item added to cart"
                );
            }
            Event::ItemRemovedFromCart {
                order_id,
                order_item_id,
            } => {
                debug!(order_id = %order_id, order_item_id = %order_item_id, "Item removed from cart");
            }
            Event::CartCancelled { order_id, team_id } => {
                info!(order_id = %order_id, team_id = %team_id, "Cart cancelled");
            }
            Event::ItemReturned {
                order_item_id,
                hardware_id,
                ref health,
            } => {
                info!(
                    order_item_id = %order_item_id,
                    hardware_id = %hardware_id,
                    health = %health,
                    "Item returned"
                );
            }
            Event::IncidentOpened {
                incident_id,
                order_item_id,
                ref state,
            } => {
                warn!(
                    incident_id = %incident_id,
                    order_item_id = %order_item_id,
                    state = %state,
                    "Incident opened"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}
