//! Integration tests for `SensorHubApi` against a canned HTTP responder.
//!
//! Each test binds a one-shot TCP listener on a random local port that
//! records the request line and answers with a fixed response.

use std::time::Duration;

use assert_matches::assert_matches;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use compost_sensorhub::api::SensorHubApi;
use compost_sensorhub::source::{FetchError, LatestReading};

const TIMEOUT: Duration = Duration::from_secs(2);

/// Serve exactly one request with `status` and a JSON `body`. Resolves the
/// returned receiver with the request line (`GET /path HTTP/1.1`).
async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let text = String::from_utf8_lossy(&request);
        let request_line = text.lines().next().unwrap_or_default().to_string();
        let _ = tx.send(request_line);

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    (format!("http://{addr}"), rx)
}

// ---------------------------------------------------------------------------
// Test: latest reading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_latest_parses_reading() {
    let (url, request) = serve_once(
        "200 OK",
        r#"{"temperature":58.5,"moisture":52,"CO2":"950","TVOC":120,"chi":0.8,"aeration":0.75}"#,
    )
    .await;
    let api = SensorHubApi::new(&url, TIMEOUT).unwrap();

    let latest = api.fetch_latest("a1b2c3").await.unwrap();

    assert_eq!(request.await.unwrap(), "GET /latest/a1b2c3 HTTP/1.1");
    let reading = assert_matches!(latest, LatestReading::Reading(r) => r);
    assert_eq!(reading.device_id, "a1b2c3");
    assert_eq!(reading.temperature, 58.5);
    assert_eq!(reading.co2, 950.0);
    assert_eq!(reading.indices(), Some((0.8, 0.75)));
}

#[tokio::test]
async fn not_found_with_error_body_is_no_data() {
    let (url, _request) = serve_once(
        "404 Not Found",
        r#"{"error":"No data found for MAC address a1b2c3"}"#,
    )
    .await;
    let api = SensorHubApi::new(&url, TIMEOUT).unwrap();

    let latest = api.fetch_latest("a1b2c3").await.unwrap();
    assert_matches!(latest, LatestReading::NoData(reason) if reason.starts_with("No data found"));
}

#[tokio::test]
async fn server_error_is_api_error() {
    let (url, _request) = serve_once("500 Internal Server Error", r#"{"detail":"boom"}"#).await;
    let api = SensorHubApi::new(&url, TIMEOUT).unwrap();

    let err = api.fetch_latest("a1b2c3").await.unwrap_err();
    assert_matches!(err, FetchError::Api { status: 500, ref body } if body.contains("boom"));
    assert_eq!(err.kind(), "api");
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let (url, _request) = serve_once("200 OK", r#"{"temperature":"warm"}"#).await;
    let api = SensorHubApi::new(&url, TIMEOUT).unwrap();

    assert_matches!(
        api.fetch_latest("a1b2c3").await,
        Err(FetchError::Malformed(_))
    );
}

// ---------------------------------------------------------------------------
// Test: devices and history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_devices_returns_ids() {
    let (url, request) = serve_once("200 OK", r#"["a1b2c3","d4e5f6"]"#).await;
    let api = SensorHubApi::new(&url, TIMEOUT).unwrap();

    let devices = api.list_devices().await.unwrap();

    assert_eq!(request.await.unwrap(), "GET /devices HTTP/1.1");
    assert_eq!(devices, vec!["a1b2c3", "d4e5f6"]);
}

#[tokio::test]
async fn fetch_history_normalizes_table() {
    let (url, request) = serve_once(
        "200 OK",
        r#"[["timestamp","temperature","moisture","CO2","TVOC"],
            ["2025-03-01 11:00:00","50","40","700","90"],
            ["2025-03-01 11:00:05","51","41","710","95"]]"#,
    )
    .await;
    let api = SensorHubApi::new(&url, TIMEOUT).unwrap();

    let history = api.fetch_history("a1b2c3").await.unwrap();

    assert_eq!(request.await.unwrap(), "GET /data?device_id=a1b2c3 HTTP/1.1");
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.device_id == "a1b2c3"));
    assert_eq!(history[1].moisture, 41.0);
}

// ---------------------------------------------------------------------------
// Test: transport failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_hub_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = SensorHubApi::new(&format!("http://{addr}"), TIMEOUT).unwrap();

    let err = api.fetch_latest("a1b2c3").await.unwrap_err();
    assert_matches!(err, FetchError::Transport(_));
    assert_eq!(err.kind(), "transport");
}
