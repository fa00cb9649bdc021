#![allow(dead_code)]

use chrono::{DateTime, Utc};
use quartermaster_api::{
    config::AppConfig,
    entities::order_item::PartHealth,
    entities::{category, hardware, order_item},
    events,
    services::catalog::{CreateCategoryRequest, CreateHardwareRequest},
    services::returns::{ReturnItemRequest, ReturnOutcome},
    AppState,
};
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by an
/// in-memory SQLite database.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application after letting the caller adjust the
    /// configuration, e.g. to enable stock retirement.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        quartermaster_api::config::init_tracing("warn", false);

        let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        cfg.auto_migrate = true;
        // A single connection keeps every session on the same in-memory
        // database and serializes transactions the way a row lock would.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let (state, event_rx) = AppState::new(cfg)
            .await
            .expect("failed to build test application state");
        let event_task = tokio::spawn(events::process_events(event_rx));

        Self {
            state,
            _event_task: event_task,
        }
    }

    /// Seed a team and return its id.
    pub async fn seed_team(&self) -> Uuid {
        self.state
            .teams
            .create_team()
            .await
            .expect("seed team for tests")
            .id
    }

    /// Seed a hardware item with the given stock level and optional
    /// per-team cap.
    pub async fn seed_hardware(
        &self,
        name: &str,
        quantity_available: i32,
        max_per_team: Option<i32>,
    ) -> hardware::Model {
        self.state
            .catalog
            .create_hardware(CreateHardwareRequest {
                name: name.to_string(),
                model_number: format!("{}-MK1", name.to_uppercase()),
                manufacturer: "Acme Components".to_string(),
                datasheet_url: "https://example.com/datasheet.pdf".to_string(),
                quantity_available,
                max_per_team,
                notes: None,
            })
            .await
            .expect("seed hardware for tests")
    }

    /// Seed a category with an optional per-team cap.
    pub async fn seed_category(&self, name: &str, max_per_team: Option<i32>) -> category::Model {
        self.state
            .catalog
            .create_category(CreateCategoryRequest {
                name: name.to_string(),
                max_per_team,
            })
            .await
            .expect("seed category for tests")
    }

    /// Put a hardware item into a category.
    pub async fn bind_category(&self, hardware_id: Uuid, category_id: Uuid) {
        self.state
            .catalog
            .assign_category(hardware_id, category_id)
            .await
            .expect("bind hardware to category for tests");
    }

    /// Add `units` of one hardware item to the team's cart and return the
    /// cart order id.
    pub async fn fill_cart(&self, team_id: Uuid, hardware_id: Uuid, units: u32) -> Uuid {
        let mut order_id = None;
        for _ in 0..units {
            let item = self
                .state
                .checkout
                .add_to_cart(team_id, hardware_id)
                .await
                .expect("add to cart for tests");
            order_id = Some(item.order_id);
        }
        order_id.expect("fill_cart needs at least one unit")
    }

    /// Build a cart, submit it, and walk it to Picked Up so its items are
    /// eligible for return. Returns the order id and its item ids.
    pub async fn checked_out_order(
        &self,
        team_id: Uuid,
        hardware_id: Uuid,
        units: u32,
    ) -> (Uuid, Vec<Uuid>) {
        let order_id = self.fill_cart(team_id, hardware_id, units).await;
        self.state
            .checkout
            .submit_order(order_id)
            .await
            .expect("submit order for tests");
        self.state
            .orders
            .mark_ready(order_id)
            .await
            .expect("mark order ready for tests");
        self.state
            .orders
            .pick_up(order_id)
            .await
            .expect("pick up order for tests");

        let (_, items) = self
            .state
            .orders
            .get_order_with_items(order_id)
            .await
            .expect("load order for tests")
            .expect("order seeded by tests exists");

        (order_id, items.into_iter().map(|item| item.id).collect())
    }

    /// Return one checked-out item with the given health.
    pub async fn return_item(&self, order_item_id: Uuid, health: PartHealth) -> ReturnOutcome {
        self.state
            .returns
            .return_item(ReturnItemRequest::new(order_item_id, health))
            .await
            .expect("return item for tests")
    }

    /// Units of a hardware item still available for checkout.
    pub async fn remaining(&self, hardware_id: Uuid) -> i64 {
        self.state
            .checkout
            .remaining(hardware_id)
            .await
            .expect("read stock level for tests")
            .quantity_remaining
    }

    /// Reload one order item.
    pub async fn reload_item(&self, order_id: Uuid, order_item_id: Uuid) -> order_item::Model {
        let (_, items) = self
            .state
            .orders
            .get_order_with_items(order_id)
            .await
            .expect("load order for tests")
            .expect("order seeded by tests exists");
        items
            .into_iter()
            .find(|item| item.id == order_item_id)
            .expect("order item seeded by tests exists")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// A fixed timestamp with whole-second precision, so equality survives the
/// database round trip.
pub fn fixed_time() -> DateTime<Utc> {
    use chrono::TimeZone;
    Utc.with_ymd_and_hms(2025, 3, 1, 14, 30, 0).unwrap()
}
