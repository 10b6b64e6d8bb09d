//! HTTP surface: the `/ping` route behind the admission middleware.

mod admission;
mod handler;
mod identity;
mod message;
mod server;

use axum::routing::any;
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

pub use admission::rate_limit;
pub use handler::ping;
pub use identity::{client_identity, identity_from_addr, IdentityError};
pub use message::Message;
pub use server::HttpServer;

use crate::ratelimit::RateLimiter;

/// Build the application router.
///
/// Only `/ping` is rate limited; unknown paths fall through to a plain 404.
/// Requests must carry `ConnectInfo<SocketAddr>` for per-client limiting, as
/// provided by `into_make_service_with_connect_info`.
pub fn router(rate_limiter: RateLimiter) -> Router {
    Router::new()
        .route("/ping", any(ping))
        .route_layer(middleware::from_fn_with_state(rate_limiter, rate_limit))
        .layer(TraceLayer::new_for_http())
}
