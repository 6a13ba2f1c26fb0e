//! Order status follows the deliveries linked to it.
//!
//! Tests cover:
//! - Creating a linked delivery plans the order
//! - Validating it delivers the order, with or without a delivery note
//! - Re-validation is refused
//! - Deleting or re-linking deliveries walks the order back
//! - Order status cannot be forced through the order API

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn linked_delivery_plans_then_delivers_its_order() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;

    let delivery = app.create_delivery(Some(order_id)).await;
    assert_eq!(delivery["status"], "planned");
    assert_eq!(delivery["orderId"], order_id);
    assert_eq!(app.order(order_id).await["status"], "planned");

    let delivery_id = delivery["id"].as_i64().unwrap();
    let response = app
        .as_employee(
            Method::POST,
            &format!("/api/deliveries/{delivery_id}/validate"),
            Some(json!({ "blNumber": "BL-001", "blAmount": "120.50" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["orderStatus"], "delivered");
    assert_eq!(body["delivery"]["status"], "delivered");
    assert_eq!(body["delivery"]["blNumber"], "BL-001");
    assert!(body["delivery"]["deliveredDate"].is_string());
    assert!(body["delivery"]["validatedAt"].is_string());

    assert_eq!(app.order(order_id).await["status"], "delivered");
}

#[tokio::test]
async fn validation_without_delivery_note_leaves_bl_empty() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;
    let delivery = app.create_delivery(Some(order_id)).await;
    let delivery_id = delivery["id"].as_i64().unwrap();

    let response = app
        .as_manager(
            Method::POST,
            &format!("/api/deliveries/{delivery_id}/validate"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["delivery"]["status"], "delivered");
    assert!(body["delivery"]["blNumber"].is_null());
    assert!(body["delivery"]["blAmount"].is_null());
    assert_eq!(app.order(order_id).await["status"], "delivered");
}

#[tokio::test]
async fn validating_twice_is_a_conflict() {
    let app = TestApp::new().await;
    let delivery = app.create_delivery(None).await;
    let uri = format!("/api/deliveries/{}/validate", delivery["id"]);

    let first = app.as_manager(Method::POST, &uri, Some(json!({}))).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert!(response_json(first).await["orderStatus"].is_null());

    let second = app
        .as_manager(Method::POST, &uri, Some(json!({ "blNumber": "BL-002" })))
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_delivery_note_is_rejected() {
    let app = TestApp::new().await;
    let delivery = app.create_delivery(None).await;

    let response = app
        .as_manager(
            Method::POST,
            &format!("/api/deliveries/{}/validate", delivery["id"]),
            Some(json!({ "blAmount": "not a number" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = app
        .as_manager(Method::GET, &format!("/api/deliveries/{}", delivery["id"]), None)
        .await;
    assert_eq!(response_json(stored).await["status"], "planned");
}

#[tokio::test]
async fn quantity_and_unit_round_trip() {
    let app = TestApp::new().await;
    let response = app
        .as_manager(
            Method::POST,
            "/api/deliveries",
            Some(json!({
                "supplierId": app.fixtures.supplier,
                "groupId": app.fixtures.north,
                "plannedDate": "2025-04-10",
                "quantity": 5,
                "unit": "palettes",
                "comments": "quai 2",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = response_json(response).await;

    let fetched = response_json(
        app.as_employee(Method::GET, &format!("/api/deliveries/{}", created["id"]), None)
            .await,
    )
    .await;
    assert_eq!(fetched["quantity"], 5);
    assert_eq!(fetched["unit"], "palettes");
    assert_eq!(fetched["comment"], "quai 2");
    assert_eq!(fetched["plannedDate"], "2025-04-10");
}

#[tokio::test]
async fn deleting_the_only_delivery_reverts_order_to_pending() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;
    let delivery = app.create_delivery(Some(order_id)).await;
    assert_eq!(app.order(order_id).await["status"], "planned");

    let response = app
        .as_manager(Method::DELETE, &format!("/api/deliveries/{}", delivery["id"]), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.order(order_id).await["status"], "pending");
}

#[tokio::test]
async fn delivered_order_stays_delivered_while_a_validated_delivery_remains() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;
    let first = app.create_delivery(Some(order_id)).await;
    let second = app.create_delivery(Some(order_id)).await;

    app.as_manager(
        Method::POST,
        &format!("/api/deliveries/{}/validate", first["id"]),
        None,
    )
    .await;
    assert_eq!(app.order(order_id).await["status"], "delivered");

    app.as_manager(Method::DELETE, &format!("/api/deliveries/{}", second["id"]), None)
        .await;
    assert_eq!(app.order(order_id).await["status"], "delivered");
}

#[tokio::test]
async fn relinking_a_delivery_moves_the_status() {
    let app = TestApp::new().await;
    let first_order = app.create_order().await;
    let second_order = app.create_order().await;
    let delivery = app.create_delivery(Some(first_order)).await;

    let response = app
        .as_manager(
            Method::PUT,
            &format!("/api/deliveries/{}", delivery["id"]),
            Some(json!({ "orderId": second_order })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["orderId"], second_order);

    assert_eq!(app.order(first_order).await["status"], "pending");
    assert_eq!(app.order(second_order).await["status"], "planned");
}

#[tokio::test]
async fn partial_update_keeps_untouched_fields() {
    let app = TestApp::new().await;
    let delivery = app.create_delivery(None).await;

    let response = app
        .as_manager(
            Method::PUT,
            &format!("/api/deliveries/{}", delivery["id"]),
            Some(json!({ "invoiceReference": "FAC-2025-0099", "reconciled": true })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["invoiceReference"], "FAC-2025-0099");
    assert_eq!(updated["reconciled"], true);
    assert_eq!(updated["quantity"], 3);
    assert_eq!(updated["unit"], "colis");
    assert_eq!(updated["status"], "planned");
}

#[tokio::test]
async fn delivery_with_unknown_order_is_rejected() {
    let app = TestApp::new().await;
    let before = response_json(app.as_admin(Method::GET, "/api/deliveries", None).await).await;

    let response = app
        .as_manager(
            Method::POST,
            "/api/deliveries",
            Some(json!({
                "orderId": 9999,
                "supplierId": app.fixtures.supplier,
                "groupId": app.fixtures.north,
                "plannedDate": "2025-03-01",
                "quantity": 1,
                "unit": "colis",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let after = response_json(app.as_admin(Method::GET, "/api/deliveries", None).await).await;
    assert_eq!(after["total"], before["total"]);
}

#[tokio::test]
async fn order_status_cannot_be_forced_forward() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;

    let response = app
        .as_manager(
            Method::PUT,
            &format!("/api/orders/{order_id}"),
            Some(json!({ "status": "delivered" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.order(order_id).await["status"], "pending");
}

#[tokio::test]
async fn order_with_deliveries_cannot_be_reset_to_pending() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;
    app.create_delivery(Some(order_id)).await;

    let response = app
        .as_manager(
            Method::PUT,
            &format!("/api/orders/{order_id}"),
            Some(json!({ "status": "pending", "comment": "relance" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.order(order_id).await["status"], "planned");
}

#[tokio::test]
async fn deleting_an_order_unlinks_its_deliveries() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;
    let delivery = app.create_delivery(Some(order_id)).await;

    let response = app
        .as_manager(Method::DELETE, &format!("/api/orders/{order_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let gone = app
        .as_admin(Method::GET, &format!("/api/orders/{order_id}"), None)
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let kept = response_json(
        app.as_manager(Method::GET, &format!("/api/deliveries/{}", delivery["id"]), None)
            .await,
    )
    .await;
    assert!(kept["orderId"].is_null());
}

#[tokio::test]
async fn order_lists_its_deliveries() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;
    app.create_delivery(Some(order_id)).await;
    app.create_delivery(None).await;

    let response = app
        .as_employee(Method::GET, &format!("/api/orders/{order_id}/deliveries"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}
