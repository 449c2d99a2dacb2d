//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): proxied requests by set, status
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `failover_probes_total` (counter): probe classifications by set
//! - `failover_transitions_total` (counter): role changes by set, reason
//! - `failover_primary_active` (gauge): 1 = primary active, 0 = fallback
//!
//! # Design Decisions
//! - Low-overhead updates (atomic operations)
//! - The Prometheus listener is optional; recording without it is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::failover::probe::ProbeOutcome;
use crate::failover::state::{Role, Transition};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record one proxied request and its latency.
pub fn record_proxy_request(set: &str, status: u16, start_time: Instant) {
    counter!(
        "proxy_requests_total",
        "set" => set.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "set" => set.to_string())
        .record(start_time.elapsed().as_secs_f64());
}

/// Record one probe classification.
pub fn record_probe(set: usize, outcome: ProbeOutcome) {
    counter!(
        "failover_probes_total",
        "set" => set.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record a role transition and update the active-role gauge.
pub fn record_transition(set: usize, transition: &Transition) {
    counter!(
        "failover_transitions_total",
        "set" => set.to_string(),
        "to" => transition.to.to_string(),
        "reason" => transition.reason.as_str()
    )
    .increment(1);
    gauge!("failover_primary_active", "set" => set.to_string())
        .set(if transition.to == Role::Primary { 1.0 } else { 0.0 });
}
