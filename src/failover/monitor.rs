//! Background health monitoring.
//!
//! # Responsibilities
//! - Periodically probe the primary endpoint of every set
//! - Drive threshold-counted demotion and promotion through the
//!   per-set failover state
//!
//! # Design Decisions
//! - Sets are probed concurrently; a slow probe on one set never
//!   delays another (probe timeouts are validated to be shorter than
//!   the interval)
//! - Promotion is monitor-only; live traffic can demote but never
//!   promote
//! - Shutdown is observed between cycles via the broadcast channel

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::FailoverConfig;
use crate::failover::probe::LivenessProber;
use crate::failover::registry::{EndpointRegistry, EndpointSet};
use crate::failover::state::Role;
use crate::observability::metrics;

pub struct HealthMonitor {
    registry: Arc<EndpointRegistry>,
    prober: LivenessProber,
    config: FailoverConfig,
}

impl HealthMonitor {
    pub fn new(registry: Arc<EndpointRegistry>, config: FailoverConfig) -> Self {
        let prober = LivenessProber::new(&config);
        Self {
            registry,
            prober,
            config,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.config.health_check_interval_secs,
            failure_threshold = self.config.failure_threshold,
            success_threshold = self.config.success_threshold,
            stall_detection = self.config.stall_detection_enabled,
            sets = self.registry.len(),
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.health_check_interval_secs);
        let mut ticker = time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One monitor cycle: probe every set's primary concurrently.
    async fn check_all(&self) {
        join_all(self.registry.iter().map(|set| self.check_set(set))).await;
    }

    async fn check_set(&self, set: &Arc<EndpointSet>) {
        // Read the baseline under the lock, release, then probe. The
        // lock is never held across the network call.
        let previous_height = set.with_state(|state| state.last_known_height());

        let outcome = self.prober.probe(set.probe_provider(), previous_height).await;
        metrics::record_probe(set.index, outcome);
        tracing::debug!(
            set = set.index,
            outcome = outcome.as_str(),
            previous_height = previous_height,
            "Probe completed"
        );

        let transition = set.with_state(|state| state.apply_probe(outcome, &self.config));
        if let Some(transition) = transition {
            metrics::record_transition(set.index, &transition);
            let target = set.pair.url_for(transition.to);
            match transition.to {
                Role::Fallback => tracing::warn!(
                    set = set.index,
                    from = %transition.from,
                    to = %transition.to,
                    reason = transition.reason.as_str(),
                    url = %target,
                    "Failing over to fallback endpoint"
                ),
                Role::Primary => tracing::info!(
                    set = set.index,
                    from = %transition.from,
                    to = %transition.to,
                    reason = transition.reason.as_str(),
                    url = %target,
                    "Restoring primary endpoint"
                ),
            }
        }
    }
}
