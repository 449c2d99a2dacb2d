//! Failover decision engine.
//!
//! # Data Flow
//! ```text
//! Background path (monitor.rs):
//!     Periodic timer
//!     → probe.rs probes each set's primary
//!     → state.rs counts outcomes against thresholds
//!     → demote / promote under the set's lock
//!
//! Inline path (http/server.rs):
//!     Request failure observed from the primary
//!     → state.rs demotes immediately, no threshold
//!
//! State machine (state.rs):
//!     Primary ←→ Fallback
//!     With hysteresis to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Fail fast inline, recover cautiously via the monitor only
//! - One mutex per set; cross-set operations never contend
//! - Stall detection distinguishes "reachable" from "making progress"

pub mod monitor;
pub mod probe;
pub mod registry;
pub mod state;

pub use monitor::HealthMonitor;
pub use probe::{LivenessProber, ProbeOutcome};
pub use registry::{EndpointPair, EndpointRegistry, EndpointSet, RegistryError};
pub use state::{FailoverState, Role, Transition, TransitionReason};
