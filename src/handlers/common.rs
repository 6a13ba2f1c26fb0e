use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{common::Page, errors::ServiceError};

/// Result type of every JSON handler
pub type ApiResult<T> = Result<Json<T>, ServiceError>;

/// Paginated list body
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T, M> From<Page<M>> for PaginatedResponse<T>
where
    T: From<M>,
{
    fn from(page: Page<M>) -> Self {
        let total_pages = page.total_pages();
        Self {
            items: page.items.into_iter().map(T::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages,
        }
    }
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// JSON body extractor that reports malformed payloads and failed field
/// validation as `400 Bad Request` with the error body.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header::CONTENT_TYPE};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Parcel {
        #[validate(range(min = 1))]
        quantity: i32,
    }

    fn request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn missing_field_is_a_bad_request() {
        let err = ValidatedJson::<Parcel>::from_request(request("{}"), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        assert!(err.to_string().contains("quantity"));
    }

    #[tokio::test]
    async fn invalid_field_is_a_bad_request() {
        let err = ValidatedJson::<Parcel>::from_request(request(r#"{"quantity":0}"#), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn valid_body_passes() {
        let ValidatedJson(parcel) =
            ValidatedJson::<Parcel>::from_request(request(r#"{"quantity":3}"#), &())
                .await
                .unwrap();
        assert_eq!(parcel.quantity, 3);
    }
}
