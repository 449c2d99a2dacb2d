//! HTTP server setup and the inline request path.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers and middleware
//! - Resolve the endpoint set and active role per inbound call
//! - Forward the payload via the proxy client, exactly once
//! - Classify the outcome and drive fast-path demotion
//! - Spawn the background health monitor
//!
//! # Design Decisions
//! - The set's lock is released before the outbound call is made
//! - A single inline failure from the primary demotes immediately;
//!   promotion is left entirely to the monitor
//! - Upstream application errors are relayed verbatim to the caller

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::failover::monitor::HealthMonitor;
use crate::failover::registry::{EndpointRegistry, EndpointSet};
use crate::failover::state::{Role, TransitionReason};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::proxy::client::{ProxyClient, UpstreamResponse};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EndpointRegistry>,
    pub client: ProxyClient,
}

/// HTTP server for the failover proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    registry: Arc<EndpointRegistry>,
}

impl HttpServer {
    /// Create a new HTTP server over a built endpoint registry.
    pub fn new(config: ProxyConfig, registry: Arc<EndpointRegistry>) -> Self {
        let state = AppState {
            registry: registry.clone(),
            client: ProxyClient::new(config.failover.request_timeout_secs),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            registry,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        // Outer safety net only; the proxy client's own timeout fires
        // first and produces the proper 502 body.
        let outer_timeout = Duration::from_secs(config.failover.request_timeout_secs + 1);

        Router::new()
            .route("/rpc", post(proxy_handler))
            .route("/healthz", get(healthz_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(outer_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Spawns the health monitor alongside; both observe the shutdown
    /// coordinator.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            sets = self.registry.len(),
            "HTTP server starting"
        );

        let monitor = HealthMonitor::new(self.registry.clone(), self.config.failover.clone());
        let monitor_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            monitor.run(monitor_shutdown).await;
        });

        let mut server_shutdown = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Query parameters for the proxy endpoint.
#[derive(Debug, Deserialize)]
struct RpcQuery {
    /// Endpoint set index; the first configured set by default.
    #[serde(default)]
    set: usize,
}

/// Main proxy handler: resolve set, forward once, classify, relay.
async fn proxy_handler(
    State(state): State<AppState>,
    Query(query): Query<RpcQuery>,
    headers: HeaderMap,
    payload: Bytes,
) -> Response {
    let start_time = Instant::now();
    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // Out-of-range index: fail the request, touch no state.
    let set = match state.registry.get(query.set) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(request_id = %request_id, set = query.set, error = %e, "Rejected request");
            metrics::record_proxy_request("invalid", StatusCode::BAD_REQUEST.as_u16(), start_time);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
        }
    };

    // Read the role under the lock, release, then resolve the URL.
    let routed_role = set.active_role();
    let url = set.pair.url_for(routed_role).clone();
    let set_label = set.index.to_string();

    tracing::debug!(
        request_id = %request_id,
        set = set.index,
        role = %routed_role,
        url = %url,
        "Proxying request"
    );

    match state.client.forward(&url, payload).await {
        Ok(upstream) if upstream.status.is_success() => {
            if has_error_indicator(&upstream.body) {
                // The upstream answered, but the payload itself says the
                // node is in trouble. Demote, relay the original payload.
                tracing::warn!(
                    request_id = %request_id,
                    set = set.index,
                    role = %routed_role,
                    "Upstream returned application-level error"
                );
                demote_inline(set, routed_role, TransitionReason::InlineUpstreamError);
            }
            metrics::record_proxy_request(&set_label, upstream.status.as_u16(), start_time);
            relay_response(upstream)
        }
        Ok(upstream) => {
            tracing::error!(
                request_id = %request_id,
                set = set.index,
                role = %routed_role,
                status = %upstream.status,
                "Upstream returned non-success status"
            );
            demote_inline(set, routed_role, TransitionReason::InlineTransportError);
            metrics::record_proxy_request(&set_label, StatusCode::BAD_GATEWAY.as_u16(), start_time);
            proxy_failure_response()
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                set = set.index,
                role = %routed_role,
                error = %e,
                "Upstream request failed"
            );
            demote_inline(set, routed_role, TransitionReason::InlineTransportError);
            metrics::record_proxy_request(&set_label, StatusCode::BAD_GATEWAY.as_u16(), start_time);
            proxy_failure_response()
        }
    }
}

/// Report the proxy's own liveness and the active role of every set.
async fn healthz_handler(State(state): State<AppState>) -> Response {
    let sets: Vec<_> = state
        .registry
        .iter()
        .map(|set| {
            json!({
                "index": set.index,
                "active_role": set.active_role(),
            })
        })
        .collect();

    Json(json!({ "status": "ok", "sets": sets })).into_response()
}

/// True when a JSON body carries a top-level `error` or `err` member.
///
/// Non-JSON and non-object bodies carry no indicator; an explicit
/// `"error": null` does not count.
fn has_error_indicator(body: &Bytes) -> bool {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => ["error", "err"]
            .iter()
            .any(|key| map.get(*key).is_some_and(|v| !v.is_null())),
        _ => false,
    }
}

/// Immediate fast-path demotion after an inline failure.
///
/// Only evidence gathered from the primary may demote: a failing
/// fallback has nothing to fail over to. The state re-checks the role
/// under the lock, so a concurrent transition makes this a no-op.
fn demote_inline(set: &Arc<EndpointSet>, routed_role: Role, reason: TransitionReason) {
    if routed_role != Role::Primary {
        return;
    }
    let transition = set.with_state(|state| state.demote_inline(reason));
    if let Some(transition) = transition {
        metrics::record_transition(set.index, &transition);
        tracing::warn!(
            set = set.index,
            from = %transition.from,
            to = %transition.to,
            reason = transition.reason.as_str(),
            url = %set.pair.url_for(transition.to),
            "Failing over to fallback endpoint"
        );
    }
}

/// Relay a buffered upstream response verbatim.
fn relay_response(upstream: UpstreamResponse) -> Response {
    let mut builder = Response::builder().status(upstream.status);
    if let Some(content_type) = upstream.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    match builder.body(Body::from(upstream.body)) {
        Ok(response) => response,
        Err(_) => proxy_failure_response(),
    }
}

/// Generic proxy-failure error returned for transport failures.
/// Never exposes internal role or counter state.
fn proxy_failure_response() -> Response {
    (StatusCode::BAD_GATEWAY, Json(json!({ "error": "RPC request failed" }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_error_member() {
        let body = Bytes::from(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"node not synced"}}"#);
        assert!(has_error_indicator(&body));
    }

    #[test]
    fn detects_err_member() {
        let body = Bytes::from(r#"{"err":"node not synced"}"#);
        assert!(has_error_indicator(&body));
    }

    #[test]
    fn clean_result_carries_no_indicator() {
        let body = Bytes::from(r#"{"jsonrpc":"2.0","id":1,"result":"0x64"}"#);
        assert!(!has_error_indicator(&body));
    }

    #[test]
    fn null_error_carries_no_indicator() {
        let body = Bytes::from(r#"{"jsonrpc":"2.0","id":1,"result":"0x64","error":null}"#);
        assert!(!has_error_indicator(&body));
    }

    #[test]
    fn non_json_body_carries_no_indicator() {
        assert!(!has_error_indicator(&Bytes::from_static(b"<html>busy</html>")));
    }
}
