mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{fixed_time, TestApp};
use quartermaster_api::{
    entities::order::OrderStatus,
    entities::order_item::PartHealth,
    errors::ServiceError,
    services::returns::ReturnItemRequest,
};
use uuid::Uuid;

#[tokio::test]
async fn test_healthy_return_closes_cleanly() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("function-generator", 2, None).await;

    let (order_id, items) = app.checked_out_order(team, hardware.id, 1).await;
    assert_eq!(app.remaining(hardware.id).await, 1);

    let outcome = app.return_item(items[0], PartHealth::Healthy).await;
    assert!(outcome.incident.is_none());
    assert_eq!(
        outcome.order_item.part_returned_health.as_deref(),
        Some("Healthy")
    );

    // The unit left the live set and is available again.
    assert_eq!(app.remaining(hardware.id).await, 2);
    let item = app.reload_item(order_id, items[0]).await;
    assert_eq!(item.part_returned_health.as_deref(), Some("Healthy"));
    assert!(app
        .state
        .returns
        .incident_for_item(items[0])
        .await
        .expect("Failed to query incident")
        .is_none());
}

#[tokio::test]
async fn test_broken_return_opens_incident() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("laser-cutter", 1, None).await;

    let (_, items) = app.checked_out_order(team, hardware.id, 1).await;

    let reported_at = fixed_time();
    let mut request = ReturnItemRequest::new(items[0], PartHealth::Broken);
    request.description = Some("Lens assembly cracked during transport".to_string());
    request.time_occurred = Some(reported_at);

    let outcome = app
        .state
        .returns
        .return_item(request)
        .await
        .expect("Failed to return item");

    let incident = outcome.incident.expect("Broken return should open an incident");
    assert_eq!(incident.state, "Broken");
    assert_eq!(incident.order_item_id, items[0]);
    assert_eq!(incident.time_occurred, reported_at);
    assert_eq!(incident.description, "Lens assembly cracked during transport");

    let found = app
        .state
        .returns
        .incident_for_item(items[0])
        .await
        .expect("Failed to query incident")
        .expect("Incident should be recorded");
    assert_eq!(found.id, incident.id);
}

#[tokio::test]
async fn test_lost_return_records_missing() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("rf-amplifier", 3, None).await;

    let (_, items) = app.checked_out_order(team, hardware.id, 1).await;
    let outcome = app.return_item(items[0], PartHealth::Lost).await;

    let incident = outcome.incident.expect("Lost return should open an incident");
    assert_eq!(incident.state, "Missing");

    // Retirement is off by default, so the sheet count is untouched and
    // the lost unit frees its live slot.
    let level = app
        .state
        .checkout
        .remaining(hardware.id)
        .await
        .expect("Failed to read stock level");
    assert_eq!(level.quantity_available, 3);
    assert_eq!(level.quantity_checked_out, 0);
    assert_eq!(level.quantity_remaining, 3);
}

#[tokio::test]
async fn test_heavily_used_return_opens_incident() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("drill-press", 1, None).await;

    let (_, items) = app.checked_out_order(team, hardware.id, 1).await;
    let outcome = app.return_item(items[0], PartHealth::HeavilyUsed).await;

    let incident = outcome
        .incident
        .expect("Heavily used return should open an incident");
    assert_eq!(incident.state, "Heavily Used");
    assert_eq!(incident.description, "");
}

#[tokio::test]
async fn test_second_return_rejected() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("hot-air-station", 1, None).await;

    let (_, items) = app.checked_out_order(team, hardware.id, 1).await;
    app.return_item(items[0], PartHealth::Broken).await;

    let err = app
        .state
        .returns
        .return_item(ReturnItemRequest::new(items[0], PartHealth::Healthy))
        .await
        .expect_err("Second return should be rejected");
    assert!(matches!(err, ServiceError::AlreadyReturned(id) if id == items[0]));

    // The first return's record stands: one incident, health unchanged.
    let listing = app
        .state
        .returns
        .list_incidents(1, 10)
        .await
        .expect("Failed to list incidents");
    assert_eq!(listing.total, 1);
    assert_eq!(listing.incidents[0].state, "Broken");
}

#[tokio::test]
async fn test_return_requires_checkout() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("bench-psu", 2, None).await;

    // Still in the cart.
    let item = app
        .state
        .checkout
        .add_to_cart(team, hardware.id)
        .await
        .expect("Failed to add to cart");
    let err = app
        .state
        .returns
        .return_item(ReturnItemRequest::new(item.id, PartHealth::Healthy))
        .await
        .expect_err("Cart item cannot be returned");
    assert!(matches!(
        err,
        ServiceError::NotCheckedOut {
            status: OrderStatus::Cart
        }
    ));

    // Submitted but not yet staged.
    app.state
        .checkout
        .submit_order(item.order_id)
        .await
        .expect("Failed to submit order");
    let err = app
        .state
        .returns
        .return_item(ReturnItemRequest::new(item.id, PartHealth::Healthy))
        .await
        .expect_err("Submitted item is not out yet");
    assert!(matches!(
        err,
        ServiceError::NotCheckedOut {
            status: OrderStatus::Submitted
        }
    ));

    // Ready for pickup counts as out the door.
    app.state
        .orders
        .mark_ready(item.order_id)
        .await
        .expect("Failed to mark order ready");
    app.state
        .returns
        .return_item(ReturnItemRequest::new(item.id, PartHealth::Healthy))
        .await
        .expect("Staged item should be returnable");
}

#[tokio::test]
async fn test_return_unknown_item() {
    let app = TestApp::new().await;

    assert_matches!(
        app.state
            .returns
            .return_item(ReturnItemRequest::new(Uuid::new_v4(), PartHealth::Healthy))
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn test_overlong_description_rejected() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("microscope", 1, None).await;

    let (order_id, items) = app.checked_out_order(team, hardware.id, 1).await;
    let mut request = ReturnItemRequest::new(items[0], PartHealth::Broken);
    request.description = Some("x".repeat(2001));

    let err = app
        .state
        .returns
        .return_item(request)
        .await
        .expect_err("Overlong description should be rejected");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Validation failed before anything was written.
    let item = app.reload_item(order_id, items[0]).await;
    assert!(item.part_returned_health.is_none());
}

#[tokio::test]
async fn test_retirement_shrinks_stock() {
    let app = TestApp::with_config(|cfg| cfg.retire_lost_stock = true).await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("quadcopter-frame", 2, None).await;

    let (_, items) = app.checked_out_order(team, hardware.id, 2).await;
    app.return_item(items[0], PartHealth::Lost).await;

    // The lost unit is gone from the sheet count, not just the live set.
    let level = app
        .state
        .checkout
        .remaining(hardware.id)
        .await
        .expect("Failed to read stock level");
    assert_eq!(level.quantity_available, 1);
    assert_eq!(level.quantity_checked_out, 1);
    assert_eq!(level.quantity_remaining, 0);

    // Healthy returns never retire anything.
    app.return_item(items[1], PartHealth::Healthy).await;
    let level = app
        .state
        .checkout
        .remaining(hardware.id)
        .await
        .expect("Failed to read stock level");
    assert_eq!(level.quantity_available, 1);
    assert_eq!(level.quantity_checked_out, 0);
    assert_eq!(level.quantity_remaining, 1);
}

#[tokio::test]
async fn test_incident_listing_orders_by_occurrence() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("welding-kit", 3, None).await;

    let (_, items) = app.checked_out_order(team, hardware.id, 3).await;
    let base = fixed_time();
    for (offset, item_id) in items.iter().enumerate() {
        let mut request = ReturnItemRequest::new(*item_id, PartHealth::Broken);
        request.time_occurred = Some(base + Duration::hours(offset as i64));
        app.state
            .returns
            .return_item(request)
            .await
            .expect("Failed to return item");
    }

    let listing = app
        .state
        .returns
        .list_incidents(1, 2)
        .await
        .expect("Failed to list incidents");
    assert_eq!(listing.total, 3);
    assert_eq!(listing.incidents.len(), 2);
    // Most recent occurrence first.
    assert_eq!(listing.incidents[0].time_occurred, base + Duration::hours(2));
    assert_eq!(listing.incidents[1].time_occurred, base + Duration::hours(1));
}
