//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use super::router;
use crate::error::{Result, TollgateError};
use crate::ratelimit::RateLimiter;

/// HTTP server fronting the `/ping` route with the rate limiter.
pub struct HttpServer {
    listener: TcpListener,
    rate_limiter: RateLimiter,
}

impl HttpServer {
    /// Bind the listen address.
    pub async fn bind(addr: SocketAddr, rate_limiter: RateLimiter) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(addr = %addr, error = %e, "Failed to bind HTTP listener");
            TollgateError::Io(e)
        })?;
        Ok(Self {
            listener,
            rate_limiter,
        })
    }

    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!(addr = %addr, "Starting HTTP server");

        let app = router(self.rate_limiter);
        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            TollgateError::Io(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{BucketConfig, ClientRegistry, LimitScope, MonoClock};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let registry = Arc::new(ClientRegistry::new(
            BucketConfig::new(4, 2.0).unwrap(),
            Arc::new(MonoClock),
        ));
        let limiter = RateLimiter::new(registry, LimitScope::PerClient);

        let server = HttpServer::bind("127.0.0.1:0".parse().unwrap(), limiter)
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }
}
