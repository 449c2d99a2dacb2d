//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - One structured event per state transition, probe classification,
//!   and inline failure
//! - Metrics are cheap (atomic increments); the metrics listener is
//!   optional and off by default

pub mod logging;
pub mod metrics;
