//! Admission middleware.

use axum::extract::{Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use super::identity::client_identity;
use super::message::Message;
use crate::ratelimit::{Decision, LimitScope, RateLimiter, GLOBAL_IDENTITY};

/// Axum middleware that admits or rejects each request through `limiter`.
///
/// No lock is held while the inner handler runs.
pub async fn rate_limit(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    let identity = match limiter.scope() {
        LimitScope::Global => GLOBAL_IDENTITY.to_string(),
        LimitScope::PerClient => match client_identity(&req) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, uri = %req.uri(), "Cannot identify client");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
    };

    match limiter.check(&identity) {
        Decision::Allowed => next.run(req).await,
        Decision::Limited { retry_after } => rejection(retry_after.as_secs_f64()),
    }
}

/// The 429 response for a throttled request.
fn rejection(retry_after_secs: f64) -> Response {
    let mut response =
        (StatusCode::TOO_MANY_REQUESTS, Json(Message::rate_limited())).into_response();

    // Whole seconds, never zero.
    let secs = (retry_after_secs.ceil() as u64).max(1);
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(secs));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_rounds_retry_after_up() {
        let response = rejection(0.25);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "1");

        let response = rejection(2.5);
        assert_eq!(response.headers()[RETRY_AFTER], "3");
    }

    #[test]
    fn test_rejection_is_json() {
        let response = rejection(1.0);
        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            "application/json"
        );
    }
}
