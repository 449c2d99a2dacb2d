//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build registry → Start server + monitor
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Monitor exits between cycles
//!                     → Server stops accepting, drains in-flight calls
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the signal out to every task
//! - In-flight requests keep their own timeout regardless of shutdown

pub mod shutdown;

pub use shutdown::Shutdown;
