//! End-to-end test over a real TCP socket.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use tollgate::http::HttpServer;
use tollgate::ratelimit::{BucketConfig, ClientRegistry, LimitScope, MonoClock, RateLimiter};

/// Send a bare HTTP/1.1 GET and return the full response text.
async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn peer_address_drives_rate_limit() {
    // A slow refill so nothing accrues while the test runs.
    let registry = Arc::new(ClientRegistry::new(
        BucketConfig::new(2, 0.001).unwrap(),
        Arc::new(MonoClock),
    ));
    let limiter = RateLimiter::new(registry.clone(), LimitScope::PerClient);

    let server = HttpServer::bind("127.0.0.1:0".parse().unwrap(), limiter)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    let first = get(addr, "/ping").await;
    assert!(first.starts_with("HTTP/1.1 200"), "{}", first);
    assert!(first.ends_with(r#"{"status":"success","body":"Request processed successfully"}"#));

    let second = get(addr, "/ping").await;
    assert!(second.starts_with("HTTP/1.1 200"), "{}", second);

    let third = get(addr, "/ping").await;
    assert!(third.starts_with("HTTP/1.1 429"), "{}", third);
    assert!(third.contains("Rate limit exceeded. Please try again later."));

    assert!(registry.contains("127.0.0.1"));
    assert_eq!(registry.len(), 1);

    stop_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();
}
