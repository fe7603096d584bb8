//! Webhook signature middleware
//!
//! Buffers the raw body, checks the `signature` header against it, and hands
//! the untouched bytes on to the handler. The signature must be checked over
//! the exact bytes the provider sent, so this runs before any JSON parsing.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::logging::MAX_BODY_BYTES;
use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    services::signature_service::SIGNATURE_HEADER,
};

/// Rejects requests whose body does not match the `signature` header
///
/// Returns 401 Unauthorized when the header is missing, malformed, or wrong,
/// and 413 when the body exceeds `MAX_BODY_BYTES`. A disabled verifier lets
/// every request through unchanged.
pub async fn webhook_signature_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if !state.signature_verifier.is_enabled() {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::PayloadTooLarge(format!("Failed to read request body: {}", e)))?;

    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    state.signature_verifier.verify(&bytes, signature)?;

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}
