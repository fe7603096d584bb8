use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::models::common::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Duplicate delivery: transaction {reference} already recorded as subscription {existing_id}")]
    DuplicateDelivery { reference: String, existing_id: Uuid },

    #[error("Entitlement update failed after subscription {subscription_id} was stored: {source}")]
    EntitlementWrite {
        subscription_id: Uuid,
        #[source]
        source: Box<ApiError>,
    },

    #[error("Processing did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Database(_) | ApiError::EntitlementWrite { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::DuplicateDelivery { .. } => StatusCode::CONFLICT,
            ApiError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::InvalidSignature(_) => "INVALID_SIGNATURE",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::DuplicateDelivery { .. } => "DUPLICATE_DELIVERY",
            ApiError::EntitlementWrite { .. } => "ENTITLEMENT_WRITE_FAILED",
            ApiError::Timeout { .. } => "PROCESSING_TIMEOUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        let message = match self {
            ApiError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                "An internal database error occurred".to_string()
            }
            ApiError::EntitlementWrite {
                subscription_id,
                ref source,
            } => {
                tracing::error!(
                    subscription_id = %subscription_id,
                    "Entitlement write failed, subscription left in place: {:?}",
                    source
                );
                "Subscription recorded but entitlement update failed".to_string()
            }
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                "An internal error occurred".to_string()
            }
            ApiError::Timeout { seconds } => {
                tracing::warn!(
                    timeout_secs = seconds,
                    "Webhook processing timed out, writes continue in the background"
                );
                "Processing is still running; retry later".to_string()
            }
            ApiError::InvalidSignature(ref msg) => {
                tracing::warn!("Rejected webhook: {}", msg);
                "Webhook signature verification failed".to_string()
            }
            ref other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ApiError>;
