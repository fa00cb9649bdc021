//! Quartermaster API Library
//!
//! Inventory reservation and order-lifecycle engine for hardware lending at
//! events: per-team carts, race-free submission against finite stock,
//! per-team and per-category checkout limits, and return/incident
//! reconciliation that feeds availability back into the pool.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use tokio::sync::mpsc;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::{Event, EventSender};
use crate::services::catalog::CatalogService;
use crate::services::checkout::CheckoutService;
use crate::services::ledger::InventoryLedger;
use crate::services::orders::OrderService;
use crate::services::returns::ReturnService;
use crate::services::teams::TeamService;

/// The wired service stack over one shared pool. Embedding applications
/// (an HTTP layer, an admin tool) build one of these and call the services
/// directly.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub event_sender: Arc<EventSender>,
    pub ledger: InventoryLedger,
    pub orders: OrderService,
    pub returns: ReturnService,
    pub checkout: CheckoutService,
    pub catalog: CatalogService,
    pub teams: TeamService,
}

impl AppState {
    /// Builds the stack from configuration: pool, migrations (when
    /// `auto_migrate` is set), event channel, services. Returns the
    /// receiver half of the event channel; hand it to
    /// [`events::process_events`] or a custom consumer. Dropping it is
    /// also fine; event delivery is never load-bearing.
    pub async fn new(config: AppConfig) -> anyhow::Result<(Self, mpsc::Receiver<Event>)> {
        config.validate()?;

        let db = Arc::new(db::connect(&config).await?);

        if config.auto_migrate {
            db::run_migrations(&db).await?;
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let event_sender = Arc::new(EventSender::new(tx));

        let ledger = InventoryLedger::new(Arc::clone(&db));
        let orders = OrderService::new(Arc::clone(&db), Arc::clone(&event_sender));
        let returns = ReturnService::new(
            Arc::clone(&db),
            Arc::clone(&event_sender),
            config.retire_lost_stock,
        );
        let checkout = CheckoutService::new(
            Arc::clone(&db),
            Arc::clone(&event_sender),
            orders.clone(),
            returns.clone(),
            ledger.clone(),
        );
        let catalog = CatalogService::new(Arc::clone(&db));
        let teams = TeamService::new(Arc::clone(&db));

        Ok((
            Self {
                db,
                config,
                event_sender,
                ledger,
                orders,
                returns,
                checkout,
                catalog,
                teams,
            },
            rx,
        ))
    }
}
