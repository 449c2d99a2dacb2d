//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A canned JSON-RPC block-height response body.
pub fn height_result(height: u64) -> String {
    format!(r#"{{"jsonrpc":"2.0","id":1,"result":"{:#x}"}}"#, height)
}

/// Start a programmable mock JSON-RPC backend.
///
/// The closure decides the status and body for every request. The
/// request itself is drained but otherwise ignored; probe and proxy
/// traffic both land here.
pub async fn start_rpc_backend<F>(addr: SocketAddr, f: F)
where
    F: Fn() -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f();
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a mock backend that always returns the same response.
pub async fn start_fixed_backend(addr: SocketAddr, status: u16, body: &'static str) {
    start_rpc_backend(addr, move || (status, body.to_string())).await;
}
