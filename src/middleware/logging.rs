use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

use crate::{app_state::AppState, error::ApiError};

/// Largest body buffered for logging or signature checks
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const MAX_LOGGED_BODY_CHARS: usize = 2000;

/// Logs every delivery with a request id, status and latency
///
/// Bodies are only logged when `logging.log_bodies` is set, since webhook
/// payloads carry customer details.
pub async fn logging_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    if !state.config.logging.log_bodies {
        tracing::info!(request_id = %request_id, method = %method, uri = %uri, "→ Request");

        let response = next.run(request).await;

        tracing::info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %response.status().as_u16(),
            latency_ms = %start.elapsed().as_millis(),
            "← Response"
        );
        return response;
    }

    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %request_id, "Failed to read request body: {}", e);
            return ApiError::PayloadTooLarge(format!("Failed to read request body: {}", e))
                .into_response();
        }
    };

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        body = %truncate_body(&String::from_utf8_lossy(&bytes), MAX_LOGGED_BODY_CHARS),
        "→ Request"
    );

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let status = response.status();
    let (parts, body) = response.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %request_id, "Failed to read response body: {}", e);
            Bytes::new()
        }
    };

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %start.elapsed().as_millis(),
        body = %truncate_body(&String::from_utf8_lossy(&bytes), MAX_LOGGED_BODY_CHARS),
        "← Response"
    );

    Response::from_parts(parts, Body::from(bytes))
}

/// Truncate body for logging on a char boundary
fn truncate_body(body: &str, max_chars: usize) -> String {
    let body = body.trim();
    match body.char_indices().nth(max_chars) {
        None => body.to_string(),
        Some((cut, _)) => format!(
            "{}...[truncated, {} bytes total]",
            &body[..cut],
            body.len()
        ),
    }
}
