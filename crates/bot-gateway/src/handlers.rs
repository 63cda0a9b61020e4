//! HTTP Handlers
//!
//! The webhook endpoint acknowledges every well-formed update; processing
//! errors are handled inside the dispatcher and never fail the request.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;
use crate::telegram::Update;

#[derive(Serialize)]
pub struct WebhookAck {
    pub update_id: i64,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: WebhookAck,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider_connected: bool,
}

/// Telegram webhook entry point
pub async fn telegram_webhook(
    State(state): State<AppState>,
    Json(update): Json<Update>,
) -> Json<WebhookResponse> {
    let update_id = update.update_id;
    tracing::debug!(update_id, "received Telegram update");

    state.dispatcher.dispatch(update).await;

    Json(WebhookResponse {
        status: "success",
        message: "Webhook processed successfully",
        data: WebhookAck { update_id },
        timestamp: Utc::now(),
    })
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider_connected,
    })
}
