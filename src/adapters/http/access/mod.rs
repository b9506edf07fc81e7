//! HTTP adapter for the access API.
//!
//! Exposes reconciliation via REST:
//! - `POST /webhook/commerce` - Commerce platform webhooks
//! - `POST /sync/user/:external_user_id` - Full reconciliation
//! - `POST /user/:external_user_id/metrics` - Update metrics
//! - `POST /user/:external_user_id/link-chat` - Link chat identity
//! - `GET /user/:external_user_id/status` - Subscriber record
//! - `POST /revoke/:external_user_id` - Revoke all access
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{ApiError, AppState, SIGNATURE_HEADER};
pub use routes::{access_router, app};
