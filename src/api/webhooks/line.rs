//! LINE webhook handler

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use secrecy::ExposeSecret;

use crate::Error;
use crate::api::ApiState;
use crate::channels::line::{SIGNATURE_HEADER, parse_request};

/// Handle one webhook delivery
///
/// 400 on a bad signature, 500 on any other decode failure, 200 once every
/// event in the batch has been handled.
pub async fn handle_callback(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let request = match parse_request(state.channel_secret.expose_secret(), signature, &body) {
        Ok(request) => request,
        Err(Error::InvalidSignature) => {
            tracing::warn!(bytes = body.len(), "rejected webhook with invalid signature");
            return StatusCode::BAD_REQUEST;
        }
        Err(e) => {
            tracing::error!(error = %e, "cannot parse webhook request");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    tracing::debug!(
        destination = %request.destination,
        events = request.events.len(),
        "LINE webhook received"
    );

    let relayed = state.handler.dispatch(&request.events).await;
    tracing::debug!(relayed, "LINE webhook handled");

    StatusCode::OK
}
