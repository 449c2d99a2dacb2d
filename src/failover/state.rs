//! Per-set failover state machine.
//!
//! # States
//! - Primary: the set's primary endpoint receives proxied traffic
//! - Fallback: the set's fallback endpoint receives proxied traffic
//!
//! # State Transitions
//! ```text
//! Primary → Fallback: failure_threshold consecutive failed/stalled
//!                     monitor probes, OR a single inline failure
//!                     observed by live traffic (immediate)
//! Fallback → Primary: success_threshold consecutive healthy,
//!                     height-advancing probes of the primary;
//!                     monitor-only, never driven by live traffic
//! ```
//!
//! # Design Decisions
//! - Fail fast, recover cautiously: the asymmetry is deliberate
//! - Hysteresis prevents flapping
//! - Every transition resets both counters and the height baseline
//!   in the same critical section

use std::time::Instant;

use serde::Serialize;

use crate::config::FailoverConfig;
use crate::failover::probe::ProbeOutcome;

/// Which endpoint of a set currently receives proxied traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Fallback,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Primary => write!(f, "primary"),
            Role::Fallback => write!(f, "fallback"),
        }
    }
}

/// Why a role transition happened. Carried in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// Monitor accumulated failure_threshold failed or stalled probes.
    ProbeThreshold,
    /// Live traffic observed a transport failure from the primary.
    InlineTransportError,
    /// Live traffic observed an application-level error from the primary.
    InlineUpstreamError,
    /// Monitor observed success_threshold consecutive healthy probes.
    PrimaryRecovered,
}

impl TransitionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionReason::ProbeThreshold => "probe_threshold",
            TransitionReason::InlineTransportError => "inline_transport_error",
            TransitionReason::InlineUpstreamError => "inline_upstream_error",
            TransitionReason::PrimaryRecovered => "primary_recovered",
        }
    }
}

/// A completed role change, returned to the caller for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Role,
    pub to: Role,
    pub reason: TransitionReason,
}

/// Mutable failover state for one endpoint set.
///
/// Guarded by the owning set's mutex; two mutators exist (the health
/// monitor and the inline request path) and both go through that lock.
#[derive(Debug)]
pub struct FailoverState {
    active_role: Role,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_known_height: Option<u64>,
    last_transition: Instant,
}

impl FailoverState {
    /// Fresh state: primary active, counters zero, no height baseline.
    pub fn new() -> Self {
        Self {
            active_role: Role::Primary,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_known_height: None,
            last_transition: Instant::now(),
        }
    }

    pub fn active_role(&self) -> Role {
        self.active_role
    }

    pub fn last_known_height(&self) -> Option<u64> {
        self.last_known_height
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn last_transition(&self) -> Instant {
        self.last_transition
    }

    /// Apply a monitor probe of the primary endpoint.
    ///
    /// While Primary is active this drives threshold-counted demotion;
    /// while Fallback is active it drives threshold-counted promotion.
    /// Returns the transition if the role changed.
    pub fn apply_probe(
        &mut self,
        outcome: ProbeOutcome,
        policy: &FailoverConfig,
    ) -> Option<Transition> {
        match self.active_role {
            Role::Primary => match outcome {
                ProbeOutcome::Healthy(height) => {
                    self.consecutive_failures = 0;
                    self.last_known_height = Some(height);
                    None
                }
                // Stalls count exactly like transport failures.
                ProbeOutcome::Stalled | ProbeOutcome::Unhealthy => {
                    self.consecutive_failures += 1;
                    if self.consecutive_failures >= policy.failure_threshold {
                        Some(self.transition_to(Role::Fallback, TransitionReason::ProbeThreshold))
                    } else {
                        None
                    }
                }
            },
            Role::Fallback => match outcome {
                ProbeOutcome::Healthy(height) => {
                    self.consecutive_successes += 1;
                    self.last_known_height = Some(height);
                    if self.consecutive_successes >= policy.success_threshold {
                        Some(self.transition_to(Role::Primary, TransitionReason::PrimaryRecovered))
                    } else {
                        None
                    }
                }
                // No promotion credit carries across a miss.
                ProbeOutcome::Stalled | ProbeOutcome::Unhealthy => {
                    self.consecutive_successes = 0;
                    None
                }
            },
        }
    }

    /// Fast-path demotion driven by live traffic.
    ///
    /// Bypasses the failure threshold entirely: one bad live response
    /// from the primary is enough evidence to protect traffic. No-op
    /// if the set is already on fallback (including when a concurrent
    /// mutator got there first).
    pub fn demote_inline(&mut self, reason: TransitionReason) -> Option<Transition> {
        match self.active_role {
            Role::Primary => Some(self.transition_to(Role::Fallback, reason)),
            Role::Fallback => None,
        }
    }

    /// Switch roles, resetting counters and the height baseline
    /// atomically with the role change.
    fn transition_to(&mut self, to: Role, reason: TransitionReason) -> Transition {
        let from = self.active_role;
        self.active_role = to;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
        // Heights are only comparable against the same probed URL.
        self.last_known_height = None;
        self.last_transition = Instant::now();
        Transition { from, to, reason }
    }
}

impl Default for FailoverState {
    fn default() -> Self {
        Self::new()
    }
}
