//! Out-of-band liveness probing.
//!
//! # Responsibilities
//! - Issue a single block-height query against an endpoint
//! - Classify the result as Healthy / Unhealthy / Stalled
//!
//! # Design Decisions
//! - Probes are distinct from proxied client traffic
//! - One probe, one classification; no retries inside the prober
//! - Stall detection compares heights only for the same URL; the
//!   caller resets the baseline whenever the probed URL changes

use std::time::Duration;

use alloy::providers::Provider;
use tokio::time::timeout;

use crate::config::FailoverConfig;

/// Classification of a single liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Transport succeeded and the endpoint reported a usable height.
    Healthy(u64),
    /// Transport succeeded but the height did not advance past the baseline.
    Stalled,
    /// Transport failure, timeout, or malformed result.
    Unhealthy,
}

impl ProbeOutcome {
    /// Label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Healthy(_) => "healthy",
            ProbeOutcome::Stalled => "stalled",
            ProbeOutcome::Unhealthy => "unhealthy",
        }
    }
}

/// Issues block-height probes with a bounded timeout.
#[derive(Debug, Clone)]
pub struct LivenessProber {
    timeout: Duration,
    stall_detection_enabled: bool,
}

impl LivenessProber {
    pub fn new(config: &FailoverConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.probe_timeout_secs),
            stall_detection_enabled: config.stall_detection_enabled,
        }
    }

    /// Probe an endpoint and classify the result.
    ///
    /// `previous_height` is the baseline from the last successful probe of
    /// the same URL, if any.
    pub async fn probe(
        &self,
        provider: &(dyn Provider + Send + Sync),
        previous_height: Option<u64>,
    ) -> ProbeOutcome {
        let fut = provider.get_block_number();
        match timeout(self.timeout, fut).await {
            Ok(Ok(height)) => self.classify(height, previous_height),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Probe failed: rpc error");
                ProbeOutcome::Unhealthy
            }
            Err(_) => {
                tracing::debug!(timeout_secs = self.timeout.as_secs(), "Probe failed: timeout");
                ProbeOutcome::Unhealthy
            }
        }
    }

    /// Pure classification of a well-formed height reading.
    fn classify(&self, height: u64, previous_height: Option<u64>) -> ProbeOutcome {
        if self.stall_detection_enabled {
            if let Some(prev) = previous_height {
                if height <= prev {
                    return ProbeOutcome::Stalled;
                }
            }
        }
        ProbeOutcome::Healthy(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prober(stall_detection_enabled: bool) -> LivenessProber {
        let config = FailoverConfig {
            stall_detection_enabled,
            ..FailoverConfig::default()
        };
        LivenessProber::new(&config)
    }

    #[test]
    fn first_reading_is_healthy_without_baseline() {
        assert_eq!(prober(true).classify(100, None), ProbeOutcome::Healthy(100));
    }

    #[test]
    fn advancing_height_is_healthy() {
        assert_eq!(prober(true).classify(101, Some(100)), ProbeOutcome::Healthy(101));
    }

    #[test]
    fn repeated_height_is_stalled() {
        assert_eq!(prober(true).classify(100, Some(100)), ProbeOutcome::Stalled);
    }

    #[test]
    fn regressing_height_is_stalled() {
        assert_eq!(prober(true).classify(99, Some(100)), ProbeOutcome::Stalled);
    }

    #[test]
    fn stall_detection_disabled_treats_any_reading_as_healthy() {
        assert_eq!(prober(false).classify(100, Some(100)), ProbeOutcome::Healthy(100));
        assert_eq!(prober(false).classify(99, Some(100)), ProbeOutcome::Healthy(99));
    }
}
