//! Failover-aware reverse proxy for JSON-RPC blockchain endpoints.

pub mod config;
pub mod failover;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;

pub use config::ProxyConfig;
pub use failover::EndpointRegistry;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
