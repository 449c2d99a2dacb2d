//! Outbound forwarding client.
//!
//! # Responsibilities
//! - POST the raw client payload to the currently active endpoint
//! - Enforce the request timeout over the whole exchange
//! - Buffer the response body for classification by the router

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

/// Upper bound on a buffered upstream response body.
const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Errors from a single forwarding attempt.
#[derive(Debug, Error)]
pub enum ProxyClientError {
    /// The exchange did not complete within the request timeout.
    #[error("upstream request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection or protocol failure talking to the upstream.
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// The response body could not be read or exceeded the size cap.
    #[error("upstream response body unreadable: {0}")]
    Body(String),
}

/// A buffered upstream response, ready to relay or classify.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
}

/// Thin wrapper around the pooled HTTP client.
#[derive(Clone)]
pub struct ProxyClient {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl ProxyClient {
    pub fn new(request_timeout_secs: u64) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    /// Forward a payload unmodified to `url`.
    ///
    /// Exactly one attempt; the timeout covers both the request and
    /// reading the response body.
    pub async fn forward(&self, url: &Url, payload: Bytes) -> Result<UpstreamResponse, ProxyClientError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload))
            .map_err(|e| ProxyClientError::Transport(e.to_string()))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ProxyClientError::Transport(e.to_string()))?;

            let (parts, body) = response.into_parts();
            let content_type = parts.headers.get(header::CONTENT_TYPE).cloned();
            let body = axum::body::to_bytes(Body::new(body), MAX_RESPONSE_BYTES)
                .await
                .map_err(|e| ProxyClientError::Body(e.to_string()))?;

            Ok(UpstreamResponse {
                status: parts.status,
                body,
                content_type,
            })
        };

        match timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ProxyClientError::Timeout(self.timeout.as_secs())),
        }
    }
}

impl std::fmt::Debug for ProxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyClient")
            .field("timeout_secs", &self.timeout.as_secs())
            .finish()
    }
}
