use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::StatusCode,
};
use std::time::Duration;
use tracing::instrument;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::logging::MAX_BODY_BYTES,
};

/// POST /api/v1/webhooks/payment
///
/// Responds `200 OK` once both the subscription and the entitlement are
/// written. Every failure maps to its own status, see `ApiError`.
///
/// Processing runs on its own task so the two writes always finish together.
/// If it outlives `server.request_timeout_secs` the caller gets 503 while the
/// task carries on; a retry then lands on the duplicate path.
#[instrument(skip(state, body))]
pub async fn payment_webhook(
    State(state): State<AppState>,
    body: Body,
) -> Result<(StatusCode, &'static str)> {
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::PayloadTooLarge(format!("Failed to read request body: {}", e)))?;

    // Parse here rather than with the Json extractor so malformed bodies
    // get the same error shape as every other failure
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed JSON body: {}", e)))?;

    let service = state.webhook_service.clone();
    let task = tokio::spawn(async move { service.process(payload).await });

    let seconds = state.config.server.request_timeout_secs;
    match tokio::time::timeout(Duration::from_secs(seconds), task).await {
        Ok(Ok(result)) => {
            result?;
        }
        Ok(Err(join_error)) => {
            return Err(ApiError::Internal(anyhow::anyhow!(
                "Webhook processing task failed: {}",
                join_error
            )));
        }
        Err(_) => return Err(ApiError::Timeout { seconds }),
    }

    Ok((StatusCode::OK, "OK"))
}
