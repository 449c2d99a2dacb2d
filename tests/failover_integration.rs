//! End-to-end failover tests against mock JSON-RPC backends.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rpc_failover::config::{EndpointSetConfig, ProxyConfig};
use rpc_failover::failover::{EndpointRegistry, Role};
use rpc_failover::http::HttpServer;
use rpc_failover::lifecycle::Shutdown;

mod common;

fn test_config(proxy_addr: SocketAddr, sets: &[(SocketAddr, SocketAddr)]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    for (primary, fallback) in sets {
        config.endpoint_sets.push(EndpointSetConfig {
            primary: format!("http://{}", primary),
            fallback: format!("http://{}", fallback),
        });
    }
    config.failover.failure_threshold = 2;
    config.failover.success_threshold = 2;
    // Keep the monitor out of the way unless a test shortens this.
    config.failover.health_check_interval_secs = 3600;
    config.failover.probe_timeout_secs = 1;
    config.failover.request_timeout_secs = 2;
    config
}

/// Spawn the proxy and return handles for assertions and teardown.
async fn start_proxy(config: ProxyConfig) -> (Shutdown, Arc<EndpointRegistry>) {
    let registry = Arc::new(EndpointRegistry::from_config(&config.endpoint_sets).unwrap());
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, registry.clone());
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    (shutdown, registry)
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll until the set reaches the wanted role or the deadline passes.
async fn wait_for_role(
    registry: &EndpointRegistry,
    set: usize,
    wanted: Role,
    deadline: Duration,
) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if registry.get(set).unwrap().active_role() == wanted {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn relays_upstream_response_verbatim() {
    let primary: SocketAddr = "127.0.0.1:29101".parse().unwrap();
    let fallback: SocketAddr = "127.0.0.1:29102".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29103".parse().unwrap();

    common::start_fixed_backend(primary, 200, r#"{"jsonrpc":"2.0","id":1,"result":"0x10"}"#).await;
    common::start_fixed_backend(fallback, 200, r#"{"jsonrpc":"2.0","id":1,"result":"fallback"}"#).await;

    let (shutdown, registry) = start_proxy(test_config(proxy, &[(primary, fallback)])).await;

    let res = http_client()
        .post(format!("http://{}/rpc", proxy))
        .body(r#"{"jsonrpc":"2.0","method":"eth_blockNumber","params":[],"id":1}"#)
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.text().await.unwrap(),
        r#"{"jsonrpc":"2.0","id":1,"result":"0x10"}"#
    );
    assert_eq!(registry.get(0).unwrap().active_role(), Role::Primary);

    shutdown.trigger();
}

#[tokio::test]
async fn invalid_set_index_is_rejected_without_forwarding() {
    let primary: SocketAddr = "127.0.0.1:29111".parse().unwrap();
    let fallback: SocketAddr = "127.0.0.1:29112".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29113".parse().unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    common::start_rpc_backend(primary, move || {
        h.fetch_add(1, Ordering::SeqCst);
        (200, common::height_result(0x10))
    })
    .await;
    common::start_fixed_backend(fallback, 200, "{}").await;

    let (shutdown, registry) = start_proxy(test_config(proxy, &[(primary, fallback)])).await;

    // The monitor's startup probe may already have hit the backend;
    // only the delta matters.
    let hits_before = hits.load(Ordering::SeqCst);

    let res = http_client()
        .post(format!("http://{}/rpc?set=7", proxy))
        .body("{}")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 400);
    let body = res.text().await.unwrap();
    assert!(body.contains("invalid rpc set index 7"), "body: {}", body);
    assert_eq!(
        hits.load(Ordering::SeqCst),
        hits_before,
        "request must not be forwarded"
    );
    assert_eq!(registry.get(0).unwrap().active_role(), Role::Primary);

    shutdown.trigger();
}

#[tokio::test]
async fn inline_transport_failure_demotes_immediately() {
    // Nothing listens on the primary port: connection refused.
    let primary: SocketAddr = "127.0.0.1:29121".parse().unwrap();
    let fallback: SocketAddr = "127.0.0.1:29122".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29123".parse().unwrap();

    common::start_fixed_backend(fallback, 200, r#"{"jsonrpc":"2.0","id":1,"result":"fallback"}"#).await;

    let (shutdown, registry) = start_proxy(test_config(proxy, &[(primary, fallback)])).await;
    let client = http_client();

    let res = client
        .post(format!("http://{}/rpc", proxy))
        .body("{}")
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 502);
    assert_eq!(res.text().await.unwrap(), r#"{"error":"RPC request failed"}"#);

    // One failed live request is enough; no threshold involved.
    assert_eq!(registry.get(0).unwrap().active_role(), Role::Fallback);

    let res = client
        .post(format!("http://{}/rpc", proxy))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.text().await.unwrap(),
        r#"{"jsonrpc":"2.0","id":1,"result":"fallback"}"#
    );

    shutdown.trigger();
}

#[tokio::test]
async fn upstream_error_body_is_relayed_and_demotes() {
    let primary: SocketAddr = "127.0.0.1:29131".parse().unwrap();
    let fallback: SocketAddr = "127.0.0.1:29132".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29133".parse().unwrap();

    common::start_fixed_backend(primary, 200, r#"{"error":"node not synced"}"#).await;
    common::start_fixed_backend(fallback, 200, r#"{"jsonrpc":"2.0","id":1,"result":"fallback"}"#).await;

    let (shutdown, registry) = start_proxy(test_config(proxy, &[(primary, fallback)])).await;
    let client = http_client();

    // The caller receives the upstream payload and status unaltered.
    let res = client
        .post(format!("http://{}/rpc", proxy))
        .body("{}")
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), r#"{"error":"node not synced"}"#);

    assert_eq!(registry.get(0).unwrap().active_role(), Role::Fallback);

    // A successful request through the fallback never promotes.
    let res = client
        .post(format!("http://{}/rpc", proxy))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(registry.get(0).unwrap().active_role(), Role::Fallback);

    shutdown.trigger();
}

#[tokio::test]
async fn monitor_demotes_failing_primary_after_threshold() {
    let primary: SocketAddr = "127.0.0.1:29141".parse().unwrap();
    let fallback: SocketAddr = "127.0.0.1:29142".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29143".parse().unwrap();

    common::start_fixed_backend(primary, 503, "busy").await;
    common::start_fixed_backend(fallback, 200, "{}").await;

    let mut config = test_config(proxy, &[(primary, fallback)]);
    config.failover.health_check_interval_secs = 1;
    let (shutdown, registry) = start_proxy(config).await;

    // No client traffic at all: the monitor alone reaches the
    // threshold (2 consecutive failed probes) and demotes.
    assert!(wait_for_role(&registry, 0, Role::Fallback, Duration::from_secs(10)).await);

    shutdown.trigger();
}

#[tokio::test]
async fn monitor_demotes_stalled_primary() {
    let primary: SocketAddr = "127.0.0.1:29151".parse().unwrap();
    let fallback: SocketAddr = "127.0.0.1:29152".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29153".parse().unwrap();

    // Reachable, but the height never advances.
    common::start_rpc_backend(primary, move || (200, common::height_result(100))).await;
    common::start_fixed_backend(fallback, 200, "{}").await;

    let mut config = test_config(proxy, &[(primary, fallback)]);
    config.failover.health_check_interval_secs = 1;
    let (shutdown, registry) = start_proxy(config).await;

    assert!(wait_for_role(&registry, 0, Role::Fallback, Duration::from_secs(10)).await);

    shutdown.trigger();
}

#[tokio::test]
async fn monitor_promotes_recovered_primary() {
    let primary: SocketAddr = "127.0.0.1:29161".parse().unwrap();
    let fallback: SocketAddr = "127.0.0.1:29162".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29163".parse().unwrap();

    let healthy = Arc::new(AtomicBool::new(false));
    let height = Arc::new(AtomicU64::new(100));
    let (h, ht) = (healthy.clone(), height.clone());
    common::start_rpc_backend(primary, move || {
        if h.load(Ordering::SeqCst) {
            (200, common::height_result(ht.fetch_add(1, Ordering::SeqCst)))
        } else {
            (503, "down".to_string())
        }
    })
    .await;
    common::start_fixed_backend(fallback, 200, "{}").await;

    let mut config = test_config(proxy, &[(primary, fallback)]);
    config.failover.health_check_interval_secs = 1;
    let (shutdown, registry) = start_proxy(config).await;

    assert!(wait_for_role(&registry, 0, Role::Fallback, Duration::from_secs(10)).await);

    // Primary comes back with advancing heights; promotion requires
    // success_threshold consecutive healthy probes.
    healthy.store(true, Ordering::SeqCst);
    assert!(wait_for_role(&registry, 0, Role::Primary, Duration::from_secs(10)).await);

    shutdown.trigger();
}

#[tokio::test]
async fn sets_fail_over_independently() {
    let primary_a: SocketAddr = "127.0.0.1:29171".parse().unwrap(); // dead
    let fallback_a: SocketAddr = "127.0.0.1:29172".parse().unwrap();
    let primary_b: SocketAddr = "127.0.0.1:29173".parse().unwrap();
    let fallback_b: SocketAddr = "127.0.0.1:29174".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29175".parse().unwrap();

    common::start_fixed_backend(fallback_a, 200, "{}").await;
    common::start_fixed_backend(primary_b, 200, r#"{"jsonrpc":"2.0","id":1,"result":"b-primary"}"#).await;
    common::start_fixed_backend(fallback_b, 200, "{}").await;

    let config = test_config(proxy, &[(primary_a, fallback_a), (primary_b, fallback_b)]);
    let (shutdown, registry) = start_proxy(config).await;
    let client = http_client();

    // Demote set 0 through its inline fast path.
    let res = client
        .post(format!("http://{}/rpc?set=0", proxy))
        .body("{}")
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 502);
    assert_eq!(registry.get(0).unwrap().active_role(), Role::Fallback);

    // Set 1 is untouched and still serves its primary.
    assert_eq!(registry.get(1).unwrap().active_role(), Role::Primary);
    let res = client
        .post(format!("http://{}/rpc?set=1", proxy))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.text().await.unwrap(),
        r#"{"jsonrpc":"2.0","id":1,"result":"b-primary"}"#
    );

    shutdown.trigger();
}

#[tokio::test]
async fn healthz_reports_active_roles() {
    let primary: SocketAddr = "127.0.0.1:29181".parse().unwrap(); // dead
    let fallback: SocketAddr = "127.0.0.1:29182".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29183".parse().unwrap();

    common::start_fixed_backend(fallback, 200, "{}").await;

    let (shutdown, _registry) = start_proxy(test_config(proxy, &[(primary, fallback)])).await;
    let client = http_client();

    let body: serde_json::Value = client
        .get(format!("http://{}/healthz", proxy))
        .send()
        .await
        .expect("Proxy unreachable")
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sets"][0]["active_role"], "primary");

    // Demote through the inline path and observe the change.
    let _ = client
        .post(format!("http://{}/rpc", proxy))
        .body("{}")
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = client
        .get(format!("http://{}/healthz", proxy))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["sets"][0]["active_role"], "fallback");

    shutdown.trigger();
}
