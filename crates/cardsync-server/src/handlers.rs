//! HTTP handlers for the webhook surface.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use cardsync_core::events::WebhookEvent;

use crate::server::AppState;

/// Inbound webhook callback.
///
/// Always acknowledges 200: Trello redelivers on any non-2xx, and
/// redelivered creates are not idempotent here, so a failed
/// reconciliation is logged and dropped rather than surfaced.
pub async fn webhook_callback(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let event: WebhookEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable webhook payload acknowledged and dropped");
            return (StatusCode::OK, Json(serde_json::json!({})));
        }
    };

    if let Err(e) = state.reconciler.handle_change_event(&event).await {
        tracing::error!(
            error = %e,
            kind = e.error_kind(),
            action = event.action_type(),
            "reconciliation failed; event dropped"
        );
    }

    (StatusCode::OK, Json(serde_json::json!({})))
}

/// Trello pings the callback URL with a HEAD/GET when the webhook
/// subscription is created; a 200 confirms the endpoint is live.
pub async fn webhook_verify() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy"}))
}
