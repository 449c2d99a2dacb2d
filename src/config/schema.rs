//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the failover proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Ordered {primary, fallback} endpoint pairs, addressed by index.
    pub endpoint_sets: Vec<EndpointSetConfig>,

    /// Failover policy: thresholds, intervals, timeouts.
    pub failover: FailoverConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A single {primary, fallback} JSON-RPC endpoint pair.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointSetConfig {
    /// Primary JSON-RPC endpoint URL.
    pub primary: String,

    /// Fallback JSON-RPC endpoint URL, used while the primary is demoted.
    pub fallback: String,
}

/// Failover policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Consecutive failed monitor probes before demoting the primary.
    pub failure_threshold: u32,

    /// Consecutive healthy, height-advancing probes before promoting back.
    pub success_threshold: u32,

    /// Interval between health monitor cycles in seconds.
    pub health_check_interval_secs: u64,

    /// Per-probe timeout in seconds. Must be shorter than the interval.
    pub probe_timeout_secs: u64,

    /// Timeout for forwarded client requests in seconds.
    pub request_timeout_secs: u64,

    /// Treat a non-advancing block height as a probe failure.
    ///
    /// Disable for endpoints that cannot report height meaningfully;
    /// every transport-successful probe then counts as healthy.
    pub stall_detection_enabled: bool,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            success_threshold: 2,
            health_check_interval_secs: 60,
            probe_timeout_secs: 2,
            request_timeout_secs: 30,
            stall_detection_enabled: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
