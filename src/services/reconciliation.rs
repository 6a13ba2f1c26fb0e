//! Invoice reconciliation against the per-store NocoDB ledger.
//!
//! A check is advisory: it never fails the caller. Missing configuration,
//! transport errors and unexpected payloads all degrade to
//! `{exists: false, error}` for that one reference.

use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

use crate::{
    auth::{authorize, Action, AuthUser, GroupScope, Resource},
    db::DbPool,
    entities::nocodb_config,
    errors::ServiceError,
};

pub const NO_CONFIGURATION: &str = "no configuration";

/// Result of looking one invoice reference up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InvoiceCheck {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvoiceCheck {
    pub fn found(exists: bool) -> Self {
        Self {
            exists,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            exists: false,
            error: Some(error.into()),
        }
    }
}

/// One entry of a batch verification
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLookup {
    pub group_id: i32,
    pub invoice_reference: String,
    pub delivery_id: i32,
}

/// Something that can tell whether an invoice reference exists in a store's ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceLedger: Send + Sync {
    async fn contains(
        &self,
        config: &nocodb_config::Model,
        invoice_reference: &str,
    ) -> Result<bool, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct NocoListResponse {
    list: Vec<serde_json::Value>,
}

/// True when `row` holds exactly `reference` in `column`. The server-side
/// filter is only a pre-selection; NocoDB parses the `where` clause, so a
/// reference carrying filter syntax could widen it.
fn row_matches(row: &serde_json::Value, column: &str, reference: &str) -> bool {
    match row.get(column) {
        Some(serde_json::Value::String(cell)) => cell.trim() == reference,
        Some(serde_json::Value::Number(cell)) => cell.to_string() == reference,
        _ => false,
    }
}

/// NocoDB REST client (v1 data API)
#[derive(Clone)]
pub struct NocoDbClient {
    http: reqwest::Client,
}

impl NocoDbClient {
    pub fn new(timeout: Duration) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self { http })
    }

    fn table_url(config: &nocodb_config::Model) -> String {
        format!(
            "{}/api/v1/db/data/noco/{}/{}",
            config.base_url.trim_end_matches('/'),
            config.project_id,
            config.table_id
        )
    }
}

#[async_trait]
impl InvoiceLedger for NocoDbClient {
    #[instrument(skip(self, config), fields(group_id = config.group_id))]
    async fn contains(
        &self,
        config: &nocodb_config::Model,
        invoice_reference: &str,
    ) -> Result<bool, ServiceError> {
        let filter = format!("({},eq,{})", config.invoice_column, invoice_reference);
        let response = self
            .http
            .get(Self::table_url(config))
            .header("xc-token", &config.api_token)
            .query(&[("where", filter.as_str())])
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("NocoDB request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "NocoDB returned {}",
                status
            )));
        }

        let body: NocoListResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("malformed NocoDB response: {}", e))
        })?;
        let exists = body
            .list
            .iter()
            .any(|row| row_matches(row, &config.invoice_column, invoice_reference));
        debug!(candidates = body.list.len(), exists, "NocoDB lookup done");
        Ok(exists)
    }
}

/// Checks delivery invoice references against each store's ledger
#[derive(Clone)]
pub struct ReconciliationService {
    db_pool: Arc<DbPool>,
    ledger: Arc<dyn InvoiceLedger>,
}

impl ReconciliationService {
    pub fn new(db_pool: Arc<DbPool>, ledger: Arc<dyn InvoiceLedger>) -> Self {
        Self { db_pool, ledger }
    }

    /// Looks `invoice_reference` up in the ledger of `group_id`. Never fails.
    #[instrument(skip(self))]
    pub async fn verify_invoice_reference(&self, group_id: i32, invoice_reference: &str) -> InvoiceCheck {
        counter!("storeops.reconciliation.checks", 1);

        let reference = invoice_reference.trim();
        if reference.is_empty() {
            return InvoiceCheck::failed("invoice reference is empty");
        }

        let config = match nocodb_config::Entity::find()
            .filter(nocodb_config::Column::GroupId.eq(group_id))
            .one(&*self.db_pool)
            .await
        {
            Ok(Some(config)) => config,
            Ok(None) => return InvoiceCheck::failed(NO_CONFIGURATION),
            Err(e) => {
                warn!(group_id, error = %e, "could not load NocoDB configuration");
                counter!("storeops.reconciliation.failures", 1);
                return InvoiceCheck::failed("configuration could not be loaded");
            }
        };

        match self.ledger.contains(&config, reference).await {
            Ok(exists) => InvoiceCheck::found(exists),
            Err(e) => {
                warn!(group_id, error = %e, "invoice lookup failed");
                counter!("storeops.reconciliation.failures", 1);
                InvoiceCheck::failed(e.to_string())
            }
        }
    }

    /// Single verification on behalf of `actor`, who must belong to the group.
    pub async fn verify_for(
        &self,
        actor: &AuthUser,
        group_id: i32,
        invoice_reference: &str,
    ) -> Result<InvoiceCheck, ServiceError> {
        authorize(
            actor,
            Action::Verify,
            Resource::Invoices,
            GroupScope::Group(group_id),
        )?;
        Ok(self.verify_invoice_reference(group_id, invoice_reference).await)
    }

    /// Verifies every entry concurrently, keyed by delivery id. Entries for
    /// groups outside the caller's stores get an error result of their own.
    #[instrument(skip(self, actor, lookups), fields(count = lookups.len()))]
    pub async fn verify_many(
        &self,
        actor: &AuthUser,
        lookups: Vec<InvoiceLookup>,
    ) -> BTreeMap<i32, InvoiceCheck> {
        let checks = lookups.into_iter().map(|lookup| async move {
            let check = match authorize(
                actor,
                Action::Verify,
                Resource::Invoices,
                GroupScope::Group(lookup.group_id),
            ) {
                Ok(()) => {
                    self.verify_invoice_reference(lookup.group_id, &lookup.invoice_reference)
                        .await
                }
                Err(e) => InvoiceCheck::failed(e.to_string()),
            };
            (lookup.delivery_id, check)
        });

        join_all(checks).await.into_iter().collect()
    }
}
