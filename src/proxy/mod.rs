//! Outbound forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! http/server.rs resolves the active URL
//!     → client.rs POSTs the payload unmodified
//!     → status + body returned for classification
//! ```
//!
//! # Design Decisions
//! - Exactly one outbound attempt per inbound call; no retries
//! - Every call carries a bounded timeout
//! - The response body is buffered so the router can inspect it for
//!   application-level errors before relaying it verbatim

pub mod client;

pub use client::{ProxyClient, ProxyClientError, UpstreamResponse};
