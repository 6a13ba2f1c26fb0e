pub mod auth;
pub mod common;
pub mod customer_orders;
pub mod deliveries;
pub mod groups;
pub mod health;
pub mod nocodb_configs;
pub mod orders;
pub mod publicities;
pub mod reconciliation;
pub mod suppliers;
pub mod users;

use std::sync::Arc;

use crate::{
    db::DbPool,
    services::{
        customer_orders::CustomerOrderService,
        deliveries::DeliveryService,
        groups::GroupService,
        nocodb_configs::NocoDbConfigService,
        orders::OrderService,
        publicities::PublicityService,
        reconciliation::{InvoiceLedger, ReconciliationService},
        suppliers::SupplierService,
        users::UserService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub deliveries: Arc<DeliveryService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub suppliers: Arc<SupplierService>,
    pub groups: Arc<GroupService>,
    pub users: Arc<UserService>,
    pub nocodb_configs: Arc<NocoDbConfigService>,
    pub publicities: Arc<PublicityService>,
    pub customer_orders: Arc<CustomerOrderService>,
}

impl AppServices {
    /// Builds every service over one pool; `ledger` answers invoice lookups.
    pub fn new(db_pool: Arc<DbPool>, ledger: Arc<dyn InvoiceLedger>) -> Self {
        Self {
            orders: Arc::new(OrderService::new(db_pool.clone())),
            deliveries: Arc::new(DeliveryService::new(db_pool.clone())),
            reconciliation: Arc::new(ReconciliationService::new(db_pool.clone(), ledger)),
            suppliers: Arc::new(SupplierService::new(db_pool.clone())),
            groups: Arc::new(GroupService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool.clone())),
            nocodb_configs: Arc::new(NocoDbConfigService::new(db_pool.clone())),
            publicities: Arc::new(PublicityService::new(db_pool.clone())),
            customer_orders: Arc::new(CustomerOrderService::new(db_pool)),
        }
    }
}
