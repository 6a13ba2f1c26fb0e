use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StoreOps API",
        version = "1.0.0",
        description = r#"
# StoreOps Back Office API

Back office for a network of retail stores grouped by site.

## Features

- **Supplier Orders**: Plan purchase orders per store group and supplier
- **Deliveries**: Record arrivals and validate them against their delivery note
- **Order Linkage**: Order status follows the deliveries linked to it
- **Invoice Reconciliation**: Check delivery-note numbers against each store's NocoDB ledger
- **Reference Data**: Suppliers, store groups, users and NocoDB settings
- **Campaigns & Special Orders**: Publicity calendar and walk-in customer orders

## Authentication

Sign in with `POST /api/auth/login`; the response sets a session cookie that
must accompany every other `/api` request.

## Pagination

List endpoints accept `page` (1-based) and `limit` (at most 100) and answer
with `items`, `total`, `page`, `limit` and `totalPages`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Session login and logout"),
        (name = "orders", description = "Supplier purchase orders"),
        (name = "deliveries", description = "Deliveries and their validation"),
        (name = "reconciliation", description = "Invoice checks against NocoDB"),
        (name = "suppliers", description = "Supplier directory"),
        (name = "groups", description = "Store groups"),
        (name = "nocodb", description = "Per-group NocoDB settings"),
        (name = "users", description = "User accounts and roles"),
        (name = "publicities", description = "Promotional campaign calendar"),
        (name = "customer-orders", description = "Customer special orders"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Auth
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::list_order_deliveries,
        crate::handlers::orders::create_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,

        // Deliveries
        crate::handlers::deliveries::list_deliveries,
        crate::handlers::deliveries::get_delivery,
        crate::handlers::deliveries::create_delivery,
        crate::handlers::deliveries::update_delivery,
        crate::handlers::deliveries::delete_delivery,
        crate::handlers::deliveries::validate_delivery,

        // Reconciliation
        crate::handlers::reconciliation::verify_invoice,
        crate::handlers::reconciliation::verify_invoices,

        // Reference data
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,
        crate::handlers::groups::list_groups,
        crate::handlers::groups::get_group,
        crate::handlers::groups::create_group,
        crate::handlers::groups::update_group,
        crate::handlers::groups::delete_group,
        crate::handlers::nocodb_configs::get_config,
        crate::handlers::nocodb_configs::put_config,
        crate::handlers::nocodb_configs::delete_config,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,

        // Campaigns and special orders
        crate::handlers::publicities::list_publicities,
        crate::handlers::publicities::get_publicity,
        crate::handlers::publicities::create_publicity,
        crate::handlers::publicities::update_publicity,
        crate::handlers::publicities::delete_publicity,
        crate::handlers::customer_orders::list_customer_orders,
        crate::handlers::customer_orders::get_customer_order,
        crate::handlers::customer_orders::create_customer_order,
        crate::handlers::customer_orders::update_customer_order,
        crate::handlers::customer_orders::delete_customer_order,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            // Common types
            crate::handlers::common::MessageResponse,
            crate::errors::ErrorResponse,

            // Auth
            crate::auth::AuthUser,
            crate::auth::LoginCredentials,
            crate::entities::Role,

            // Orders and deliveries
            crate::entities::OrderStatus,
            crate::entities::DeliveryStatus,
            crate::entities::DeliveryUnit,
            crate::handlers::orders::OrderResponse,
            crate::services::orders::NewOrder,
            crate::services::orders::OrderPatch,
            crate::handlers::deliveries::DeliveryResponse,
            crate::handlers::deliveries::ValidationResponse,
            crate::services::deliveries::NewDelivery,
            crate::services::deliveries::DeliveryPatch,
            crate::services::deliveries::DeliveryNote,

            // Reconciliation
            crate::services::reconciliation::InvoiceCheck,
            crate::services::reconciliation::InvoiceLookup,
            crate::handlers::reconciliation::VerifyInvoiceRequest,
            crate::handlers::reconciliation::VerifyInvoicesRequest,

            // Reference data
            crate::handlers::suppliers::SupplierResponse,
            crate::services::suppliers::NewSupplier,
            crate::services::suppliers::SupplierPatch,
            crate::handlers::groups::GroupResponse,
            crate::services::groups::GroupInput,
            crate::handlers::nocodb_configs::NocoDbConfigResponse,
            crate::services::nocodb_configs::NocoDbSettings,
            crate::handlers::users::UserResponse,
            crate::services::users::NewUser,
            crate::services::users::UserPatch,

            // Campaigns and special orders
            crate::handlers::publicities::PublicityResponse,
            crate::services::publicities::NewPublicity,
            crate::services::publicities::PublicityPatch,
            crate::entities::CustomerOrderStatus,
            crate::handlers::customer_orders::CustomerOrderResponse,
            crate::services::customer_orders::NewCustomerOrder,
            crate::services::customer_orders::CustomerOrderPatch,

            crate::handlers::health::HealthResponse,
            crate::handlers::health::ComponentStatus,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("StoreOps API"));
        assert!(json.contains("/api/deliveries/{id}/validate"));
        assert!(json.contains("/api/verify-invoices"));
        assert!(json.contains("/api/groups/{id}/nocodb-config"));
    }
}
