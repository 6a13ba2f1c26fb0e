//! Sessions, roles and store-group scoping.
//!
//! Tests cover:
//! - Login, logout and the session cookie
//! - Role grants (employee vs manager vs admin)
//! - Store-group isolation for reads and writes

mod common;

use axum::http::{header, Method, StatusCode};
use common::{response_json, session_cookie, TestApp, EMPLOYEE, MANAGER, OTHER_MANAGER};
use serde_json::json;

#[tokio::test]
async fn api_requires_a_session() {
    let app = TestApp::new().await;

    for uri in ["/api/orders", "/api/deliveries", "/api/suppliers", "/api/auth/me"] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "GET {uri}");
    }

    let response = app
        .request(
            Method::POST,
            "/api/verify-invoice",
            Some(json!({ "groupId": app.fixtures.north, "invoiceReference": "FAC-1" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["database"], "up");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.login(MANAGER.0, "not-the-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());

    let response = app.login("nobody", "whatever-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_the_session_principal() {
    let app = TestApp::new().await;

    let body = response_json(app.as_manager(Method::GET, "/api/auth/me", None).await).await;
    assert_eq!(body["username"], MANAGER.0);
    assert_eq!(body["role"], "manager");
    assert_eq!(body["groupIds"], json!([app.fixtures.north]));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;
    let cookie = app.login_cookie(EMPLOYEE).await;

    let response = app
        .request(Method::POST, "/api/auth/logout", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, "/api/auth/me", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_account_cannot_log_in() {
    let app = TestApp::new().await;
    let employee_id = app.user_id(EMPLOYEE.0).await;

    let response = app
        .as_admin(
            Method::PUT,
            &format!("/api/users/{employee_id}"),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.login(EMPLOYEE.0, EMPLOYEE.1).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivation_ends_open_sessions() {
    let app = TestApp::new().await;
    let employee_id = app.user_id(EMPLOYEE.0).await;
    assert_eq!(
        app.as_employee(Method::GET, "/api/orders", None).await.status(),
        StatusCode::OK
    );

    app.as_admin(
        Method::PUT,
        &format!("/api/users/{employee_id}"),
        Some(json!({ "active": false })),
    )
    .await;

    let response = app.as_employee(Method::GET, "/api/orders", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Reactivating does not revive the flushed session.
    app.as_admin(
        Method::PUT,
        &format!("/api/users/{employee_id}"),
        Some(json!({ "active": true })),
    )
    .await;
    let response = app.as_employee(Method::GET, "/api/orders", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleted_account_loses_its_session() {
    let app = TestApp::new().await;
    let employee_id = app.user_id(EMPLOYEE.0).await;

    let response = app
        .as_admin(Method::DELETE, &format!("/api/users/{employee_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.as_employee(Method::GET, "/api/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_and_store_changes_apply_to_open_sessions() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;
    let manager_id = app.user_id(MANAGER.0).await;

    app.as_admin(
        Method::PUT,
        &format!("/api/users/{manager_id}"),
        Some(json!({ "role": "employee", "groupIds": [app.fixtures.south] })),
    )
    .await;

    let me = response_json(app.as_manager(Method::GET, "/api/auth/me", None).await).await;
    assert_eq!(me["role"], "employee");
    assert_eq!(me["groupIds"], json!([app.fixtures.south]));

    let response = app
        .as_manager(Method::GET, &format!("/api/orders/{order_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn employee_cannot_delete() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;
    let delivery = app.create_delivery(Some(order_id)).await;

    let response = app
        .as_employee(Method::DELETE, &format!("/api/deliveries/{}", delivery["id"]), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .as_employee(Method::DELETE, &format!("/api/orders/{order_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(app.order(order_id).await["status"], "planned");
}

#[tokio::test]
async fn manager_cannot_write_into_another_store() {
    let app = TestApp::new().await;

    let response = app
        .as_manager(
            Method::POST,
            "/api/deliveries",
            Some(json!({
                "supplierId": app.fixtures.supplier,
                "groupId": app.fixtures.south,
                "plannedDate": "2025-03-01",
                "quantity": 2,
                "unit": "palettes",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let listed = response_json(app.as_admin(Method::GET, "/api/deliveries", None).await).await;
    assert_eq!(listed["total"], 0);
}

#[tokio::test]
async fn rows_of_other_stores_are_hidden() {
    let app = TestApp::new().await;
    let order_id = app.create_order().await;
    let other = app.login_cookie(OTHER_MANAGER).await;

    let response = app
        .request(Method::GET, &format!("/api/orders/{order_id}"), None, Some(&other))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let listed = response_json(
        app.request(Method::GET, "/api/orders", None, Some(&other))
            .await,
    )
    .await;
    assert_eq!(listed["total"], 0);
    assert_eq!(listed["items"], json!([]));

    let own = response_json(app.as_manager(Method::GET, "/api/orders", None).await).await;
    assert_eq!(own["total"], 1);
    assert_eq!(own["totalPages"], 1);
}

#[tokio::test]
async fn user_administration_is_admin_only() {
    let app = TestApp::new().await;

    let response = app.as_manager(Method::GET, "/api/users", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .as_manager(
            Method::POST,
            "/api/users",
            Some(json!({
                "username": "intruder",
                "password": "long-enough-password",
                "role": "admin",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.as_admin(Method::GET, "/api/users", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = TestApp::new().await;

    let response = app
        .as_admin(
            Method::POST,
            "/api/users",
            Some(json!({
                "username": MANAGER.0,
                "password": "another-password",
                "role": "employee",
                "groupIds": [app.fixtures.north],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn store_group_in_use_cannot_be_deleted() {
    let app = TestApp::new().await;
    app.create_order().await;

    let response = app
        .as_admin(Method::DELETE, &format!("/api/groups/{}", app.fixtures.north), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .as_manager(Method::DELETE, &format!("/api/groups/{}", app.fixtures.north), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .as_admin(Method::GET, &format!("/api/groups/{}", app.fixtures.north), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deleting_an_unused_group_removes_its_settings() {
    let app = TestApp::new().await;
    let group = &format!("/api/groups/{}", app.fixtures.south);

    let response = app
        .as_admin(
            Method::PUT,
            &format!("{group}/nocodb-config"),
            Some(json!({
                "baseUrl": "https://noco.example.com",
                "apiToken": "token",
                "projectId": "p",
                "tableId": "t",
                "invoiceColumn": "Ref",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.as_admin(Method::DELETE, group, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.as_admin(Method::GET, group, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app
        .as_admin(Method::GET, &format!("{group}/nocodb-config"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let me = response_json(
        app.request(
            Method::GET,
            "/api/auth/me",
            None,
            Some(&app.login_cookie(OTHER_MANAGER).await),
        )
        .await,
    )
    .await;
    assert_eq!(me["groupIds"], json!([]));
}

#[tokio::test]
async fn invalid_payload_reports_the_field() {
    let app = TestApp::new().await;

    let response = app
        .as_manager(
            Method::POST,
            "/api/deliveries",
            Some(json!({
                "supplierId": app.fixtures.supplier,
                "groupId": app.fixtures.north,
                "plannedDate": "2025-03-01",
                "quantity": 0,
                "unit": "colis",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap_or_default().contains("quantity"));
}

#[tokio::test]
async fn session_cookie_is_http_only() {
    let app = TestApp::new().await;
    let response = app.login(MANAGER.0, MANAGER.1).await;
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(raw.starts_with("storeops.sid="));
    assert!(raw.contains("HttpOnly"));
}
