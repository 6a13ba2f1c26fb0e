use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{ApiResult, ValidatedJson};
use crate::{
    auth::{Action, AuthRouterExt, AuthUser, Resource},
    services::reconciliation::{InvoiceCheck, InvoiceLookup},
    AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyInvoiceRequest {
    pub group_id: i32,
    pub invoice_reference: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyInvoicesRequest {
    #[validate(length(max = 500))]
    pub invoice_references: Vec<InvoiceLookup>,
}

#[utoipa::path(
    post,
    path = "/api/verify-invoice",
    request_body = VerifyInvoiceRequest,
    responses(
        (status = 200, description = "Lookup result, with `error` when the check could not be made", body = InvoiceCheck),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Group outside the caller's stores", body = crate::errors::ErrorResponse)
    ),
    tag = "reconciliation"
)]
pub async fn verify_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<VerifyInvoiceRequest>,
) -> ApiResult<InvoiceCheck> {
    let check = state
        .services
        .reconciliation
        .verify_for(&user, payload.group_id, &payload.invoice_reference)
        .await?;
    Ok(Json(check))
}

#[utoipa::path(
    post,
    path = "/api/verify-invoices",
    request_body = VerifyInvoicesRequest,
    responses(
        (status = 200, description = "One result per entry, keyed by delivery id", body = BTreeMap<String, InvoiceCheck>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "reconciliation"
)]
pub async fn verify_invoices(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<VerifyInvoicesRequest>,
) -> ApiResult<BTreeMap<i32, InvoiceCheck>> {
    let results = state
        .services
        .reconciliation
        .verify_many(&user, payload.invoice_references)
        .await;
    Ok(Json(results))
}

pub fn reconciliation_routes() -> Router<AppState> {
    Router::new()
        .route("/verify-invoice", post(verify_invoice))
        .route("/verify-invoices", post(verify_invoices))
        .with_permission(Resource::Invoices, Action::Verify)
}
