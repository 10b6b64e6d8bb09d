//! Background eviction of idle client state.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::registry::ClientRegistry;

/// Periodically removes clients that have been idle longer than a threshold.
#[derive(Debug, Clone)]
pub struct Reclaimer {
    registry: Arc<ClientRegistry>,
    interval: Duration,
    idle_threshold: Duration,
}

impl Reclaimer {
    /// Create a reclaimer that sweeps `registry` every `interval`.
    ///
    /// `idle_threshold` should exceed `interval` so a client active within the
    /// last sweep window is never evicted; configuration validation enforces it.
    pub fn new(registry: Arc<ClientRegistry>, interval: Duration, idle_threshold: Duration) -> Self {
        Self {
            registry,
            interval,
            idle_threshold,
        }
    }

    /// Run a single sweep now. Returns the number of evicted clients.
    pub fn sweep_once(&self) -> usize {
        let evicted = self.registry.sweep_idle(self.idle_threshold);
        if evicted > 0 {
            info!(
                evicted,
                remaining = self.registry.len(),
                "Reclaimed idle clients"
            );
        }
        evicted
    }

    /// Sweep on every tick until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can be idle yet.
        ticker.tick().await;

        debug!(
            interval_secs = self.interval.as_secs(),
            idle_threshold_secs = self.idle_threshold.as_secs(),
            "Reclaimer started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }

        debug!("Reclaimer stopped");
    }

    /// Spawn [`run`](Self::run) onto the current tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
