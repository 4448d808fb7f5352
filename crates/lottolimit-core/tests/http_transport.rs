//! End-to-end checks of the API client over real HTTP against a mock backend.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lottolimit_core::api::{ApiClient, HttpMethod, RequestOptions, RetryPolicy};
use lottolimit_core::models::{LimitCategory, LimitRecord};
use lottolimit_core::LimitStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Requests seen by the mock backend, as "METHOD /path" plus the body.
type Seen = Arc<Mutex<Vec<(String, String)>>>;

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn read_request(socket: &mut TcpStream) -> (String, String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(split) = text.find("\r\n\r\n") {
            let head = &text[..split];
            let content_length = head
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= split + 4 + content_length {
                let request_line = head.lines().next().unwrap_or_default();
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default();
                let path = parts.next().unwrap_or_default();
                let body = text[split + 4..].to_string();
                return (format!("{} {}", method, path), body);
            }
        }
    }
    (String::new(), String::new())
}

/// Serve `script` answers in order, then keep repeating the last one.
async fn start_scripted_backend(script: Vec<(u16, &'static str)>) -> (SocketAddr, Arc<AtomicUsize>, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));

    let counter = hits.clone();
    let log = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = script[index.min(script.len() - 1)];
            let request = read_request(&mut socket).await;
            log.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line(status),
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (addr, hits, seen)
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn retries_server_errors_over_http() {
    let (addr, hits, _) = start_scripted_backend(vec![(503, ""), (429, ""), (200, r#"{"07":{"limit":5000,"amount":250}}"#)]).await;
    let client = ApiClient::new(format!("http://{}", addr)).unwrap().with_retry(fast_retry());

    let url = client.url("/api/limits/2digit");
    let data = client.request(&url, &RequestOptions::get(), true).await.unwrap();

    assert_eq!(data["07"]["amount"], 250);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn cached_read_skips_network_until_write() {
    let (addr, hits, seen) = start_scripted_backend(vec![
        (200, r#"{"07":{"limit":5000,"amount":0}}"#),
        (200, r#"{"success":true}"#),
        (200, r#"{"07":{"limit":5000,"amount":250}}"#),
    ])
    .await;
    let client = ApiClient::new(format!("http://{}", addr)).unwrap().with_retry(fast_retry());
    let store = LimitStore::new(client);

    store.limits(LimitCategory::TwoDigit).await;
    store.limits(LimitCategory::TwoDigit).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    store
        .update_limit(LimitCategory::TwoDigit, "07", LimitRecord::new(5000.0, 250.0))
        .await
        .unwrap();
    let table = store.limits(LimitCategory::TwoDigit).await;

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(table["07"].amount, 250.0);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[1].0, "PUT /api/limits/2digit/07");
    let body: serde_json::Value = serde_json::from_str(&seen[1].1).unwrap();
    assert_eq!(body["limit"], 5000.0);
}

#[tokio::test]
async fn exhausted_retries_surface_status() {
    let (addr, hits, _) = start_scripted_backend(vec![(500, r#"{"error":"down"}"#)]).await;
    let client = ApiClient::new(format!("http://{}", addr)).unwrap().with_retry(fast_retry());

    let url = client.url("/api/transactions");
    let options = RequestOptions::method(HttpMethod::Post).with_body(serde_json::json!({"number": "07"}));
    let err = client.request(&url, &options, false).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}
