mod common;

use assert_matches::assert_matches;
use common::TestApp;
use quartermaster_api::{entities::order::OrderStatus, errors::ServiceError};
use uuid::Uuid;

#[tokio::test]
async fn test_full_lifecycle_walks_forward() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("microcontroller", 5, None).await;

    let order_id = app.fill_cart(team, hardware.id, 2).await;
    let order = app
        .state
        .orders
        .get_order(order_id)
        .await
        .expect("Failed to load order")
        .expect("Order should exist");
    assert_eq!(order.status, OrderStatus::Cart.as_str());
    assert_eq!(order.team_id, team);

    let order = app
        .state
        .checkout
        .submit_order(order_id)
        .await
        .expect("Failed to submit order");
    assert_eq!(order.status, OrderStatus::Submitted.as_str());

    let order = app
        .state
        .orders
        .mark_ready(order_id)
        .await
        .expect("Failed to mark order ready");
    assert_eq!(order.status, OrderStatus::ReadyForPickup.as_str());

    let order = app
        .state
        .orders
        .pick_up(order_id)
        .await
        .expect("Failed to record pickup");
    assert_eq!(order.status, OrderStatus::PickedUp.as_str());

    let (_, items) = app
        .state
        .orders
        .get_order_with_items(order_id)
        .await
        .expect("Failed to load order")
        .expect("Order should exist");
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.hardware_id == hardware.id));
    assert!(items.iter().all(|item| item.part_returned_health.is_none()));
}

#[tokio::test]
async fn test_transitions_cannot_skip() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("relay-board", 5, None).await;
    let order_id = app.fill_cart(team, hardware.id, 1).await;

    let err = app
        .state
        .orders
        .mark_ready(order_id)
        .await
        .expect_err("Cart cannot become ready without submission");
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: OrderStatus::Cart,
            to: OrderStatus::ReadyForPickup,
        }
    ));

    let err = app
        .state
        .orders
        .pick_up(order_id)
        .await
        .expect_err("Cart cannot be picked up");
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: OrderStatus::Cart,
            to: OrderStatus::PickedUp,
        }
    ));

    app.state
        .checkout
        .submit_order(order_id)
        .await
        .expect("Failed to submit order");
    let err = app
        .state
        .orders
        .pick_up(order_id)
        .await
        .expect_err("Pickup requires the staging step");
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: OrderStatus::Submitted,
            to: OrderStatus::PickedUp,
        }
    ));
}

#[tokio::test]
async fn test_transitions_cannot_reverse_or_repeat() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("encoder", 5, None).await;
    let order_id = app.fill_cart(team, hardware.id, 1).await;

    app.state
        .checkout
        .submit_order(order_id)
        .await
        .expect("Failed to submit order");
    app.state
        .orders
        .mark_ready(order_id)
        .await
        .expect("Failed to mark order ready");

    let err = app
        .state
        .orders
        .mark_ready(order_id)
        .await
        .expect_err("Marking ready twice should fail");
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: OrderStatus::ReadyForPickup,
            to: OrderStatus::ReadyForPickup,
        }
    ));

    app.state
        .orders
        .pick_up(order_id)
        .await
        .expect("Failed to record pickup");
    let err = app
        .state
        .orders
        .mark_ready(order_id)
        .await
        .expect_err("Statuses never move backwards");
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: OrderStatus::PickedUp,
            to: OrderStatus::ReadyForPickup,
        }
    ));

    let err = app
        .state
        .checkout
        .submit_order(order_id)
        .await
        .expect_err("Picked-up order cannot be resubmitted");
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: OrderStatus::PickedUp,
            to: OrderStatus::Submitted,
        }
    ));
}

#[tokio::test]
async fn test_empty_cart_cannot_submit() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("breadboard", 5, None).await;

    let item = app
        .state
        .checkout
        .add_to_cart(team, hardware.id)
        .await
        .expect("Failed to add to cart");
    let order_id = item.order_id;
    app.state
        .checkout
        .remove_from_cart(item.id)
        .await
        .expect("Failed to remove cart item");

    let err = app
        .state
        .checkout
        .submit_order(order_id)
        .await
        .expect_err("Empty cart should not submit");
    assert!(matches!(err, ServiceError::EmptyOrder(id) if id == order_id));

    // The cart survives the refused submission and can be filled again.
    let item = app
        .state
        .checkout
        .add_to_cart(team, hardware.id)
        .await
        .expect("Failed to refill cart");
    assert_eq!(item.order_id, order_id);
    app.state
        .checkout
        .submit_order(order_id)
        .await
        .expect("Refilled cart should submit");
}

#[tokio::test]
async fn test_resubmission_rejected() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let hardware = app.seed_hardware("keypad", 5, None).await;
    let order_id = app.fill_cart(team, hardware.id, 1).await;

    app.state
        .checkout
        .submit_order(order_id)
        .await
        .expect("Failed to submit order");
    let err = app
        .state
        .checkout
        .submit_order(order_id)
        .await
        .expect_err("Submitting twice should fail");
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: OrderStatus::Submitted,
            to: OrderStatus::Submitted,
        }
    ));

    // The double submission committed nothing extra.
    assert_eq!(app.remaining(hardware.id).await, 4);
}

#[tokio::test]
async fn test_operations_on_unknown_orders() {
    let app = TestApp::new().await;
    let missing = Uuid::new_v4();

    assert_matches!(
        app.state.checkout.submit_order(missing).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        app.state.orders.mark_ready(missing).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        app.state.orders.pick_up(missing).await,
        Err(ServiceError::NotFound(_))
    );
    assert!(app
        .state
        .orders
        .get_order(missing)
        .await
        .expect("Failed to query order")
        .is_none());
}

#[tokio::test]
async fn test_list_orders_for_team() {
    let app = TestApp::new().await;
    let team = app.seed_team().await;
    let other_team = app.seed_team().await;
    let hardware = app.seed_hardware("display-panel", 10, None).await;

    for _ in 0..2 {
        let order_id = app.fill_cart(team, hardware.id, 1).await;
        app.state
            .checkout
            .submit_order(order_id)
            .await
            .expect("Failed to submit order");
    }
    app.fill_cart(team, hardware.id, 1).await;
    app.fill_cart(other_team, hardware.id, 1).await;

    let page1 = app
        .state
        .orders
        .list_orders_for_team(team, 1, 2)
        .await
        .expect("Failed to list orders");
    assert_eq!(page1.total, 3);
    assert_eq!(page1.orders.len(), 2);
    assert!(page1.orders.iter().all(|order| order.team_id == team));

    let page2 = app
        .state
        .orders
        .list_orders_for_team(team, 2, 2)
        .await
        .expect("Failed to list orders");
    assert_eq!(page2.orders.len(), 1);
}
