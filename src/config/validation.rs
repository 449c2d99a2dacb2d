//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoint URLs actually parse
//! - Validate value ranges (thresholds >= 1, timeouts > 0)
//! - Enforce probe timeout < monitor interval
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate a parsed configuration. Returns all problems found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoint_sets.is_empty() {
        errors.push(err("endpoint_sets", "at least one endpoint set is required"));
    }

    for (i, set) in config.endpoint_sets.iter().enumerate() {
        for (name, url) in [("primary", &set.primary), ("fallback", &set.fallback)] {
            if Url::parse(url).is_err() {
                errors.push(err(
                    &format!("endpoint_sets[{}].{}", i, name),
                    format!("invalid URL '{}'", url),
                ));
            }
        }
    }

    let f = &config.failover;
    if f.failure_threshold == 0 {
        errors.push(err("failover.failure_threshold", "must be at least 1"));
    }
    if f.success_threshold == 0 {
        errors.push(err("failover.success_threshold", "must be at least 1"));
    }
    if f.probe_timeout_secs == 0 {
        errors.push(err("failover.probe_timeout_secs", "must be greater than 0"));
    }
    if f.request_timeout_secs == 0 {
        errors.push(err("failover.request_timeout_secs", "must be greater than 0"));
    }
    if f.health_check_interval_secs == 0 {
        errors.push(err("failover.health_check_interval_secs", "must be greater than 0"));
    }
    // A hung probe must never delay the next monitor cycle.
    if f.probe_timeout_secs >= f.health_check_interval_secs {
        errors.push(err(
            "failover.probe_timeout_secs",
            "must be strictly shorter than health_check_interval_secs",
        ));
    }

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(err(
            "listener.bind_address",
            format!("invalid socket address '{}'", config.listener.bind_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
