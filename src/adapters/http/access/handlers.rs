//! HTTP handlers for the access API.
//!
//! These handlers connect Axum routes to the application layer handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::{
    AccessCommandError, ChatIdentityResolver, EventRouter, GetSubscriberHandler, GetSubscriberQuery,
    LinkChatIdentityCommand, LinkChatIdentityHandler, ReconciliationEngine, RevokeAccessCommand,
    RevokeAccessHandler, SyncSubscriberCommand, SyncSubscriberHandler, UpdateMetricsCommand,
    UpdateMetricsHandler, WebhookHandlingError,
};
use crate::domain::foundation::{
    ChatUserId, DomainError, ErrorCode, ExternalUserId, Timestamp, ValidationError,
};
use crate::ports::{AccessGateway, SubscriberStore};

use super::dto::{
    ErrorResponse, HealthResponse, LinkChatRequest, ReconciliationResponse, RevocationResponse,
    SubscriberUpdateResponse, UpdateMetricsRequest, WebhookAck,
};

/// Header carrying the webhook HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubscriberStore>,
    pub access_gateway: Arc<dyn AccessGateway>,
    pub engine: Arc<ReconciliationEngine>,
    pub resolver: Arc<ChatIdentityResolver>,
    pub event_router: Arc<EventRouter>,
}

impl AppState {
    pub fn sync_handler(&self) -> SyncSubscriberHandler {
        SyncSubscriberHandler::new(self.resolver.clone(), self.engine.clone())
    }

    pub fn update_metrics_handler(&self) -> UpdateMetricsHandler {
        UpdateMetricsHandler::new(self.store.clone(), self.engine.clone())
    }

    pub fn link_chat_handler(&self) -> LinkChatIdentityHandler {
        LinkChatIdentityHandler::new(self.store.clone(), self.engine.clone())
    }

    pub fn revoke_handler(&self) -> RevokeAccessHandler {
        RevokeAccessHandler::new(self.store.clone(), self.engine.clone())
    }

    pub fn get_subscriber_handler(&self) -> GetSubscriberHandler {
        GetSubscriberHandler::new(self.store.clone())
    }
}

fn external_user_id(raw: String) -> Result<ExternalUserId, ApiError> {
    ExternalUserId::new(raw).map_err(ApiError::from)
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhook/commerce - Commerce platform events
pub async fn handle_commerce_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    state.event_router.handle(&body, signature).await?;

    Ok(Json(WebhookAck { received: true }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /sync/user/:external_user_id - Full reconciliation
pub async fn sync_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = SyncSubscriberCommand {
        external_user_id: external_user_id(raw_id)?,
    };

    let result = state.sync_handler().handle(cmd).await?;

    Ok(Json(ReconciliationResponse::from(&result)))
}

/// POST /user/:external_user_id/metrics - Merge metrics, re-derive tiers
pub async fn update_metrics(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(request): Json<UpdateMetricsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = UpdateMetricsCommand {
        external_user_id: external_user_id(raw_id)?,
        metrics: request.into_patch()?,
    };

    let result = state.update_metrics_handler().handle(cmd).await?;

    Ok(Json(SubscriberUpdateResponse::from(result)))
}

/// POST /user/:external_user_id/link-chat - Link a chat identity
pub async fn link_chat(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(request): Json<LinkChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = LinkChatIdentityCommand {
        external_user_id: external_user_id(raw_id)?,
        chat_user_id: ChatUserId::new(request.chat_user_id)?,
    };

    let result = state.link_chat_handler().handle(cmd).await?;

    Ok(Json(SubscriberUpdateResponse::from(result)))
}

/// POST /revoke/:external_user_id - Revoke everything and clear the subscription
pub async fn revoke_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = RevokeAccessCommand {
        external_user_id: external_user_id(raw_id)?,
    };

    let result = state.revoke_handler().handle(cmd).await?;

    Ok(Json(RevocationResponse::from(&result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /user/:external_user_id/status - Stored subscriber record
pub async fn get_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetSubscriberQuery {
        external_user_id: external_user_id(raw_id)?,
    };

    let subscriber = state.get_subscriber_handler().handle(query).await?;

    Ok(Json(subscriber))
}

/// GET /health - Liveness and chat gateway readiness
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        access_gateway_ready: state.access_gateway.is_ready(),
        timestamp: Timestamp::now(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts application errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code {
            code if code.is_not_found() => StatusCode::NOT_FOUND,
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidSignature => StatusCode::UNAUTHORIZED,
            ErrorCode::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AccessCommandError> for ApiError {
    fn from(err: AccessCommandError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<WebhookHandlingError> for ApiError {
    fn from(err: WebhookHandlingError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(ErrorCode::ValidationFailed, err.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::new(err.code, err.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = %self.code, error = %self.message, "Request failed");
        }
        let body = ErrorResponse::new(self.code.to_string(), self.message);
        (status, Json(body)).into_response()
    }
}
