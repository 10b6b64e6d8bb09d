//! The inner `/ping` handler.

use axum::http::StatusCode;
use axum::Json;
use tracing::trace;

use super::message::Message;

/// Answer an admitted request.
pub async fn ping() -> (StatusCode, Json<Message>) {
    trace!("Handling ping");
    (StatusCode::OK, Json(Message::success()))
}
