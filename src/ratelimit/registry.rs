//! Per-client state table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::bucket::{BucketConfig, Decision, TokenBucket};
use super::clock::Clock;

/// State tracked for a single client identity.
pub struct ClientEntry {
    identity: String,
    bucket: Mutex<TokenBucket>,
    /// Last request time, read only by the reclaimer.
    last_seen: Mutex<Instant>,
    clock: Arc<dyn Clock>,
}

impl ClientEntry {
    fn new(identity: &str, config: BucketConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            identity: identity.to_string(),
            bucket: Mutex::new(TokenBucket::new(config, now)),
            last_seen: Mutex::new(now),
            clock,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Consult this client's bucket, consuming a token when one is available.
    pub fn allow(&self) -> bool {
        self.check().is_allowed()
    }

    /// Like [`allow`](Self::allow), but reports how long to wait when limited.
    pub fn check(&self) -> Decision {
        let mut bucket = self.bucket.lock();
        // Read the clock under the lock so successive checks see non-decreasing time.
        let now = self.clock.now();
        bucket.check(now)
    }

    /// Tokens left in the bucket as of its last refill.
    pub fn tokens(&self) -> f64 {
        self.bucket.lock().tokens()
    }

    pub fn last_seen(&self) -> Instant {
        *self.last_seen.lock()
    }

    fn touch(&self, now: Instant) {
        let mut last_seen = self.last_seen.lock();
        if now > *last_seen {
            *last_seen = now;
        }
    }
}

impl std::fmt::Debug for ClientEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientEntry")
            .field("identity", &self.identity)
            .field("bucket", &*self.bucket.lock())
            .field("last_seen", &self.last_seen())
            .finish()
    }
}

/// Concurrency-safe map from client identity to its [`ClientEntry`].
///
/// Entries are created lazily on first contact. Structural changes are
/// serialized per map shard, while each entry's bucket has its own lock so
/// admission decisions for different clients never wait on each other.
pub struct ClientRegistry {
    clients: DashMap<String, Arc<ClientEntry>>,
    bucket: BucketConfig,
    clock: Arc<dyn Clock>,
}

impl ClientRegistry {
    /// Create an empty registry whose buckets use `bucket` and read time from `clock`.
    pub fn new(bucket: BucketConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clients: DashMap::new(),
            bucket,
            clock,
        }
    }

    /// Fetch the entry for `identity`, creating it with a full bucket if absent.
    ///
    /// Marks the client as seen now. When two callers race to create the same
    /// identity exactly one entry is stored and both receive it.
    pub fn get_or_create(&self, identity: &str) -> Arc<ClientEntry> {
        let now = self.clock.now();

        if let Some(entry) = self.clients.get(identity).map(|e| Arc::clone(e.value())) {
            entry.touch(now);
            return entry;
        }

        let entry = Arc::clone(
            self.clients
                .entry(identity.to_string())
                .or_insert_with(|| {
                    debug!(
                        identity = %identity,
                        capacity = self.bucket.capacity(),
                        refill_rate = self.bucket.refill_rate_per_second(),
                        "Creating client bucket"
                    );
                    Arc::new(ClientEntry::new(identity, self.bucket, Arc::clone(&self.clock)))
                })
                .value(),
        );
        entry.touch(now);
        entry
    }

    /// Remove every entry not seen within `idle_threshold` of `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, idle_threshold: Duration, now: Instant) -> usize {
        let mut evicted = 0;
        self.clients.retain(|identity, entry| {
            let idle = now.saturating_duration_since(entry.last_seen());
            let keep = idle <= idle_threshold;
            if !keep {
                trace!(identity = %identity, idle_ms = idle.as_millis() as u64, "Evicting idle client");
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// [`sweep`](Self::sweep) as of the registry clock's current time.
    pub fn sweep_idle(&self, idle_threshold: Duration) -> usize {
        self.sweep(idle_threshold, self.clock.now())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.clients.contains_key(identity)
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Drop all client state.
    pub fn clear(&self) {
        self.clients.clear();
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients", &self.clients.len())
            .field("bucket", &self.bucket)
            .finish()
    }
}
