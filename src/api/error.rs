//! HTTP mapping for service errors.
//!
//! Bodies are always `{"error": "<message>"}`. Storage failures are logged and
//! answered with a generic message so connection strings or SQL never leak.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::aggregates::OrderError;
use crate::domain::value_objects::SessionIdError;
use crate::EcommerceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] EcommerceError),

    #[error("Unauthorized")]
    Unauthorized,
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Service(e.into()) }
}

impl From<SessionIdError> for ApiError {
    fn from(e: SessionIdError) -> Self { Self::Service(e.into()) }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self { Self::Service(e.into()) }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Service(e) => match e {
                EcommerceError::Validation(_) => StatusCode::BAD_REQUEST,
                EcommerceError::ProductNotFound(_)
                | EcommerceError::OrderNotFound(_)
                | EcommerceError::CartItemNotFound(_)
                | EcommerceError::NotificationNotFound(_) => StatusCode::NOT_FOUND,
                EcommerceError::Order(
                    OrderError::InvalidTransition { .. }
                    | OrderError::InvalidPaymentTransition { .. }
                    | OrderError::ConcurrentUpdate,
                ) => StatusCode::CONFLICT,
                EcommerceError::Order(_) => StatusCode::BAD_REQUEST,
                EcommerceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderStatus;
    use crate::store::StoreError;

    async fn body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes() {
        let status = |e: EcommerceError| ApiError::from(e).status();
        assert_eq!(status(EcommerceError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(OrderError::NoItems.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(EcommerceError::OrderNotFound("ORD-1".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(EcommerceError::CartItemNotFound(3)), StatusCode::NOT_FOUND);
        assert_eq!(
            status(OrderError::InvalidTransition { from: OrderStatus::Delivered, to: OrderStatus::Pending }.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(status(OrderError::ConcurrentUpdate.into()), StatusCode::CONFLICT);
        assert_eq!(status(OrderError::TotalTooLarge.into()), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_storage_details_hidden() {
        let err = ApiError::from(EcommerceError::Storage(StoreError::Unavailable("postgres://user:pw@db".into())));
        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_client_errors_carry_message() {
        let (status, json) = body(EcommerceError::ProductNotFound(42).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Product 42 not found");
    }
}
