//! Axum router configuration for the access API.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    get_status, handle_commerce_webhook, health, link_chat, revoke_user, sync_user, update_metrics,
    AppState,
};

/// Create the access API router.
///
/// # Routes
///
/// ## Webhook Endpoints (signature verified when a secret is configured)
/// - `POST /webhook/commerce` - Commerce platform events
///
/// ## Subscriber Endpoints
/// - `POST /sync/user/:external_user_id` - Full reconciliation
/// - `POST /user/:external_user_id/metrics` - Update performance metrics
/// - `POST /user/:external_user_id/link-chat` - Link a chat identity
/// - `GET /user/:external_user_id/status` - Stored subscriber record
/// - `POST /revoke/:external_user_id` - Revoke all access
///
/// ## Operational
/// - `GET /health` - Liveness
pub fn access_router() -> Router<AppState> {
    webhook_router().merge(api_router())
}

fn webhook_router() -> Router<AppState> {
    Router::new().route("/webhook/commerce", post(handle_commerce_webhook))
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/sync/user/:external_user_id", post(sync_user))
        .route("/user/:external_user_id/metrics", post(update_metrics))
        .route("/user/:external_user_id/link-chat", post(link_chat))
        .route("/user/:external_user_id/status", get(get_status))
        .route("/revoke/:external_user_id", post(revoke_user))
        .route("/health", get(health))
}

/// The full service: routes, state, request tracing and a request timeout.
///
/// The webhook route runs without the request timeout. Its gateway calls are
/// individually bounded, and a 408 would only make the sender redeliver an
/// event whose grants were already applied.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    webhook_router()
        .merge(api_router().layer(TimeoutLayer::new(request_timeout)))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
