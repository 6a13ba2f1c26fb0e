//! Invoice checks against a store's NocoDB ledger, served by wiremock.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const TABLE_PATH: &str = "/api/v1/db/data/noco/p_store/t_invoices";

async fn configure_ledger(app: &TestApp, group: i32, server: &MockServer) {
    let response = app
        .as_admin(
            Method::PUT,
            &format!("/api/groups/{group}/nocodb-config"),
            Some(json!({
                "baseUrl": server.uri(),
                "apiToken": "noco-secret",
                "projectId": "p_store",
                "tableId": "t_invoices",
                "invoiceColumn": "NumeroFacture",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["hasToken"], true);
    assert!(body.get("apiToken").is_none());
}

async fn mount_invoice(server: &MockServer, reference: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("xc-token", "noco-secret"))
        .and(query_param("where", format!("(NumeroFacture,eq,{reference})")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "list": rows, "pageInfo": { "totalRows": 1 } })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn known_reference_exists() {
    let app = TestApp::new().await;
    let server = MockServer::start().await;
    configure_ledger(&app, app.fixtures.north, &server).await;
    mount_invoice(&server, "FAC-2025-0099", json!([{ "Id": 1, "NumeroFacture": "FAC-2025-0099" }])).await;

    let response = app
        .as_employee(
            Method::POST,
            "/api/verify-invoice",
            Some(json!({ "groupId": app.fixtures.north, "invoiceReference": "  FAC-2025-0099 " })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["exists"], true);
    assert!(body.get("error").map_or(true, Value::is_null));
}

#[tokio::test]
async fn filter_syntax_in_reference_cannot_widen_the_match() {
    let app = TestApp::new().await;
    let server = MockServer::start().await;
    configure_ledger(&app, app.fixtures.north, &server).await;
    mount_invoice(
        &server,
        "NOPE)~or(Id,gt,0",
        json!([{ "Id": 1, "NumeroFacture": "FAC-OTHER" }, { "Id": 2, "NumeroFacture": "FAC-2025-0099" }]),
    )
    .await;

    let body = response_json(
        app.as_manager(
            Method::POST,
            "/api/verify-invoice",
            Some(json!({ "groupId": app.fixtures.north, "invoiceReference": "NOPE)~or(Id,gt,0" })),
        )
        .await,
    )
    .await;
    assert_eq!(body["exists"], false);
    assert!(body.get("error").map_or(true, Value::is_null));
}

#[tokio::test]
async fn unknown_reference_does_not_exist() {
    let app = TestApp::new().await;
    let server = MockServer::start().await;
    configure_ledger(&app, app.fixtures.north, &server).await;
    mount_invoice(&server, "FAC-0000", json!([])).await;

    let body = response_json(
        app.as_manager(
            Method::POST,
            "/api/verify-invoice",
            Some(json!({ "groupId": app.fixtures.north, "invoiceReference": "FAC-0000" })),
        )
        .await,
    )
    .await;
    assert_eq!(body["exists"], false);
    assert!(body.get("error").map_or(true, Value::is_null));
}

#[tokio::test]
async fn group_without_configuration_reports_it() {
    let app = TestApp::new().await;

    let response = app
        .as_manager(
            Method::POST,
            "/api/verify-invoice",
            Some(json!({ "groupId": app.fixtures.north, "invoiceReference": "FAC-1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["exists"], false);
    assert_eq!(body["error"], "no configuration");
}

#[tokio::test]
async fn ledger_outage_degrades_to_an_error_result() {
    let app = TestApp::new().await;
    let server = MockServer::start().await;
    configure_ledger(&app, app.fixtures.north, &server).await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let response = app
        .as_manager(
            Method::POST,
            "/api/verify-invoice",
            Some(json!({ "groupId": app.fixtures.north, "invoiceReference": "FAC-1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["exists"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn batch_isolates_each_failure() {
    let app = TestApp::new().await;
    let server = MockServer::start().await;
    configure_ledger(&app, app.fixtures.north, &server).await;
    mount_invoice(&server, "FAC-A", json!([{ "Id": 1, "NumeroFacture": "FAC-A" }])).await;
    mount_invoice(&server, "FAC-B", json!([])).await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("where", "(NumeroFacture,eq,FAC-BROKEN)"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let response = app
        .as_manager(
            Method::POST,
            "/api/verify-invoices",
            Some(json!({
                "invoiceReferences": [
                    { "groupId": app.fixtures.north, "invoiceReference": "FAC-A", "deliveryId": 11 },
                    { "groupId": app.fixtures.north, "invoiceReference": "FAC-B", "deliveryId": 12 },
                    { "groupId": app.fixtures.north, "invoiceReference": "FAC-BROKEN", "deliveryId": 13 },
                    { "groupId": app.fixtures.south, "invoiceReference": "FAC-A", "deliveryId": 14 },
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let results = body.as_object().expect("map keyed by delivery id");
    assert_eq!(results.len(), 4);

    assert_eq!(results["11"]["exists"], true);
    assert_eq!(results["12"]["exists"], false);
    assert!(results["12"].get("error").map_or(true, Value::is_null));
    assert_eq!(results["13"]["exists"], false);
    assert!(results["13"]["error"].is_string());
    // The manager does not belong to the second store.
    assert_eq!(results["14"]["exists"], false);
    assert!(results["14"]["error"].is_string());
}

#[tokio::test]
async fn verifying_another_store_is_forbidden() {
    let app = TestApp::new().await;

    let response = app
        .as_employee(
            Method::POST,
            "/api/verify-invoice",
            Some(json!({ "groupId": app.fixtures.south, "invoiceReference": "FAC-1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn configuration_update_keeps_the_stored_token() {
    let app = TestApp::new().await;
    let server = MockServer::start().await;
    configure_ledger(&app, app.fixtures.north, &server).await;

    let response = app
        .as_admin(
            Method::PUT,
            &format!("/api/groups/{}/nocodb-config", app.fixtures.north),
            Some(json!({
                "baseUrl": server.uri(),
                "projectId": "p_store",
                "tableId": "t_invoices",
                "invoiceColumn": "NumeroFacture",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["hasToken"], true);

    // Still authenticates with the original token.
    mount_invoice(&server, "FAC-KEEP", json!([{ "Id": 3, "NumeroFacture": "FAC-KEEP" }])).await;
    let body = response_json(
        app.as_manager(
            Method::POST,
            "/api/verify-invoice",
            Some(json!({ "groupId": app.fixtures.north, "invoiceReference": "FAC-KEEP" })),
        )
        .await,
    )
    .await;
    assert_eq!(body["exists"], true);
}

#[tokio::test]
async fn managers_cannot_edit_ledger_settings() {
    let app = TestApp::new().await;

    let response = app
        .as_manager(
            Method::PUT,
            &format!("/api/groups/{}/nocodb-config", app.fixtures.north),
            Some(json!({
                "baseUrl": "https://noco.example.com",
                "apiToken": "t",
                "projectId": "p",
                "tableId": "t",
                "invoiceColumn": "c",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
