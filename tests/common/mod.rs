use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use storeops_api::{
    build_app,
    config::AppConfig,
    db,
    entities::Role,
    services::users::{NewUser, UserService},
    AppState,
};
use tower::ServiceExt;

pub const ADMIN: (&str, &str) = ("admin", "admin-password");
pub const MANAGER: (&str, &str) = ("marie", "manager-password");
pub const EMPLOYEE: (&str, &str) = ("eric", "employee-password");
/// Manager of the second store only
pub const OTHER_MANAGER: (&str, &str) = ("sophie", "manager-password");

/// Ids of the rows every test starts with.
#[derive(Debug, Clone, Copy)]
pub struct Fixtures {
    /// Store the manager and the employee belong to
    pub north: i32,
    /// Store only the other manager belongs to
    pub south: i32,
    pub supplier: i32,
}

/// Application over a fresh in-memory SQLite database, with one admin, two
/// stores, a supplier and a few accounts already created.
pub struct TestApp {
    router: Router,
    pub fixtures: Fixtures,
    admin: String,
    manager: String,
    employee: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.nocodb_timeout_secs = 2;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to migrate test database");

        let state = AppState::new(Arc::new(pool), cfg).expect("failed to build app state");
        let router = build_app(state.clone()).expect("failed to build router");

        UserService::new(state.db.clone())
            .create_unchecked(NewUser {
                username: ADMIN.0.to_string(),
                password: ADMIN.1.to_string(),
                role: Role::Admin,
                group_ids: vec![],
            })
            .await
            .expect("failed to seed admin");

        let mut app = Self {
            router,
            fixtures: Fixtures {
                north: 0,
                south: 0,
                supplier: 0,
            },
            admin: String::new(),
            manager: String::new(),
            employee: String::new(),
        };

        app.admin = app.login_cookie(ADMIN).await;
        let north = app.seed(Method::POST, "/api/groups", json!({ "name": "Nord" })).await;
        let south = app.seed(Method::POST, "/api/groups", json!({ "name": "Sud" })).await;
        let supplier = app
            .seed(
                Method::POST,
                "/api/suppliers",
                json!({ "name": "Grossiste Dupont", "email": "contact@dupont.example" }),
            )
            .await;
        app.fixtures = Fixtures {
            north,
            south,
            supplier,
        };

        app.create_account(MANAGER, "manager", north).await;
        app.create_account(EMPLOYEE, "employee", north).await;
        app.create_account(OTHER_MANAGER, "manager", south).await;
        app.manager = app.login_cookie(MANAGER).await;
        app.employee = app.login_cookie(EMPLOYEE).await;
        app
    }

    async fn seed(&self, method: Method, uri: &str, body: Value) -> i32 {
        let response = self.as_admin(method, uri, Some(body)).await;
        assert_eq!(response.status(), StatusCode::OK, "seeding {uri} failed");
        response_json(response).await["id"]
            .as_i64()
            .expect("seeded row has an id") as i32
    }

    async fn create_account(&self, (username, password): (&str, &str), role: &str, group: i32) {
        self.seed(
            Method::POST,
            "/api/users",
            json!({
                "username": username,
                "password": password,
                "role": role,
                "groupIds": [group],
            }),
        )
        .await;
    }

    /// Posts credentials to the login endpoint.
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": username, "password": password })),
            None,
        )
        .await
    }

    /// Logs in and returns the `name=value` pair of the session cookie.
    pub async fn login_cookie(&self, (username, password): (&str, &str)) -> String {
        let response = self.login(username, password).await;
        assert_eq!(response.status(), StatusCode::OK, "login of {username} failed");
        session_cookie(&response).expect("login sets a session cookie")
    }

    /// Sends a request with an optional JSON body and session cookie.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("failed to serialize request body"))
            }
            None => Body::empty(),
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.admin)).await
    }

    pub async fn as_manager(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.manager)).await
    }

    pub async fn as_employee(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.employee)).await
    }

    /// Creates a pending order in the manager's store and returns its id.
    pub async fn create_order(&self) -> i32 {
        let response = self
            .as_manager(
                Method::POST,
                "/api/orders",
                Some(json!({
                    "supplierId": self.fixtures.supplier,
                    "groupId": self.fixtures.north,
                    "plannedDate": "2025-03-01",
                    "quantity": 3,
                    "unit": "colis",
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let order = response_json(response).await;
        assert_eq!(order["status"], "pending");
        order["id"].as_i64().expect("order id") as i32
    }

    /// Records a delivery in the manager's store, linked to `order_id` when given.
    pub async fn create_delivery(&self, order_id: Option<i32>) -> Value {
        let response = self
            .as_manager(
                Method::POST,
                "/api/deliveries",
                Some(json!({
                    "orderId": order_id,
                    "supplierId": self.fixtures.supplier,
                    "groupId": self.fixtures.north,
                    "scheduledDate": "2025-03-01",
                    "quantity": 3,
                    "unit": "colis",
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        response_json(response).await
    }

    /// Id of the account named `username`, looked up as the admin.
    pub async fn user_id(&self, username: &str) -> i64 {
        let users = response_json(self.as_admin(Method::GET, "/api/users", None).await).await;
        users
            .as_array()
            .and_then(|list| list.iter().find(|u| u["username"] == username))
            .and_then(|u| u["id"].as_i64())
            .expect("account listed")
    }

    /// Reads an order back as the admin.
    pub async fn order(&self, id: i32) -> Value {
        let response = self
            .as_admin(Method::GET, &format!("/api/orders/{id}"), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        response_json(response).await
    }
}

/// Extracts `name=value` from the response's `set-cookie` header.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
