//! StoreOps API Library
//!
//! Back office for a network of retail stores: supplier orders and their
//! deliveries, invoice reconciliation against each store's NocoDB ledger,
//! promotional campaigns and customer special orders.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{http::HeaderValue, Extension, Router};
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::{
    auth::AuthService,
    db::DbPool,
    errors::ServiceError,
    services::reconciliation::{InvoiceLedger, NocoDbClient},
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// State backed by the real NocoDB client.
    pub fn new(db: Arc<DbPool>, config: config::AppConfig) -> Result<Self, ServiceError> {
        let ledger = Arc::new(NocoDbClient::new(Duration::from_secs(
            config.nocodb_timeout_secs,
        ))?);
        Ok(Self::with_ledger(db, config, ledger))
    }

    /// State with an explicit invoice ledger.
    pub fn with_ledger(
        db: Arc<DbPool>,
        config: config::AppConfig,
        ledger: Arc<dyn InvoiceLedger>,
    ) -> Self {
        Self {
            services: handlers::AppServices::new(db.clone(), ledger),
            auth: Arc::new(AuthService::new(db.clone())),
            db,
            config,
        }
    }
}

/// Every JSON route, to be nested under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/orders", handlers::orders::order_routes())
        .nest("/deliveries", handlers::deliveries::delivery_routes())
        .merge(handlers::reconciliation::reconciliation_routes())
        .nest("/suppliers", handlers::suppliers::supplier_routes())
        .nest(
            "/groups",
            handlers::groups::group_routes().merge(handlers::nocodb_configs::nocodb_config_routes()),
        )
        .nest("/users", handlers::users::user_routes())
        .nest("/publicities", handlers::publicities::publicity_routes())
        .nest(
            "/customer-orders",
            handlers::customer_orders::customer_order_routes(),
        )
}

/// Builds the CORS layer from configuration.
pub fn cors_layer(cfg: &config::AppConfig) -> Result<CorsLayer, ServiceError> {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            environment = %cfg.environment,
            "using permissive CORS because explicit origins were not configured"
        );
        Ok(CorsLayer::permissive())
    } else {
        Err(ServiceError::InternalError(
            "missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .to_string(),
        ))
    }
}

/// Full application: API, health, Swagger UI and the middleware stack.
pub fn build_app(state: AppState) -> Result<Router, ServiceError> {
    let cfg = &state.config;

    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_name(cfg.session_cookie_name.clone())
        .with_secure(cfg.session_secure_cookie)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            cfg.session_ttl_minutes,
        )));
    let cors = cors_layer(cfg)?;
    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let auth = state.auth.clone();

    handlers::health::init_start_time();

    let app = Router::new()
        .nest("/api", api_routes())
        .merge(handlers::health::health_routes())
        .with_state(state)
        .merge(openapi::swagger_ui())
        .layer(Extension(auth))
        .layer(sessions)
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(cors)
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ));

    Ok(app)
}
