//! Admission decisions over the client registry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bucket::Decision;
use super::registry::ClientRegistry;

/// Identity used for every request when the limit is global.
pub const GLOBAL_IDENTITY: &str = "*";

/// Whether buckets are kept per client or shared by all requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitScope {
    /// One bucket per client source address
    #[default]
    PerClient,
    /// A single bucket shared by every request
    Global,
}

/// The rate limiter consulted by the admission middleware.
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    registry: Arc<ClientRegistry>,
    scope: LimitScope,
}

impl RateLimiter {
    /// Create a rate limiter over `registry`.
    pub fn new(registry: Arc<ClientRegistry>, scope: LimitScope) -> Self {
        Self { registry, scope }
    }

    /// Decide whether a request from `identity` may proceed.
    ///
    /// Under [`LimitScope::Global`] the identity is ignored.
    pub fn check(&self, identity: &str) -> Decision {
        let identity = match self.scope {
            LimitScope::PerClient => identity,
            LimitScope::Global => GLOBAL_IDENTITY,
        };

        let decision = self.registry.get_or_create(identity).check();

        if let Decision::Limited { retry_after } = decision {
            debug!(
                identity = %identity,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
        }

        decision
    }

    pub fn scope(&self) -> LimitScope {
        self.scope
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::bucket::BucketConfig;
    use crate::ratelimit::clock::ManualClock;
    use std::time::Duration;

    fn limiter(scope: LimitScope) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let registry = Arc::new(ClientRegistry::new(
            BucketConfig::new(4, 2.0).unwrap(),
            clock.clone(),
        ));
        (RateLimiter::new(registry, scope), clock)
    }

    #[test]
    fn test_per_client_limits_each_identity() {
        let (limiter, _) = limiter(LimitScope::PerClient);

        for _ in 0..4 {
            assert!(limiter.check("10.0.0.1").is_allowed());
        }
        assert!(!limiter.check("10.0.0.1").is_allowed());
        assert!(limiter.check("10.0.0.2").is_allowed());
        assert_eq!(limiter.registry().len(), 2);
    }

    #[test]
    fn test_global_scope_shares_one_bucket() {
        let (limiter, _) = limiter(LimitScope::Global);

        for i in 0..4 {
            assert!(limiter.check(&format!("10.0.0.{}", i)).is_allowed());
        }
        assert!(!limiter.check("10.0.0.99").is_allowed());
        assert_eq!(limiter.registry().len(), 1);
        assert!(limiter.registry().contains(GLOBAL_IDENTITY));
    }

    #[test]
    fn test_refill_after_rejection() {
        let (limiter, clock) = limiter(LimitScope::PerClient);
        for _ in 0..4 {
            limiter.check("10.0.0.1");
        }
        assert!(!limiter.check("10.0.0.1").is_allowed());

        clock.advance(Duration::from_millis(500));
        assert!(limiter.check("10.0.0.1").is_allowed());
        assert!(!limiter.check("10.0.0.1").is_allowed());
    }

    #[test]
    fn test_scope_deserializes_snake_case() {
        let scope: LimitScope = serde_json::from_str("\"per_client\"").unwrap();
        assert_eq!(scope, LimitScope::PerClient);
        let scope: LimitScope = serde_json::from_str("\"global\"").unwrap();
        assert_eq!(scope, LimitScope::Global);
    }
}
