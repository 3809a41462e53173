//! Integration tests for `resolve_device` against a canned sensor hub.

use std::time::Duration;

use assert_matches::assert_matches;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use compost_monitor::error::MonitorError;
use compost_monitor::resolve_device;
use compost_sensorhub::api::SensorHubApi;
use compost_sensorhub::source::FetchError;

const TIMEOUT: Duration = Duration::from_secs(2);

/// Answer a single request with `status` and a JSON `body`.
async fn hub_once(status: &'static str, body: &'static str) -> SensorHubApi {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 2048];
        let _ = socket.read(&mut buf).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    SensorHubApi::new(&format!("http://{addr}"), TIMEOUT).unwrap()
}

// ---------------------------------------------------------------------------
// Test: a configured device skips discovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn configured_device_wins() {
    // Nothing listens here; discovery would fail.
    let api = SensorHubApi::new("http://127.0.0.1:9", TIMEOUT).unwrap();

    let device = resolve_device(&api, Some("d4e5f6")).await.unwrap();
    assert_eq!(device, "d4e5f6");
}

// ---------------------------------------------------------------------------
// Test: discovery picks the first listed device
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discovers_first_device() {
    let api = hub_once("200 OK", r#"["a1b2c3","d4e5f6"]"#).await;

    let device = resolve_device(&api, None).await.unwrap();
    assert_eq!(device, "a1b2c3");
}

#[tokio::test]
async fn empty_device_list_is_an_error() {
    let api = hub_once("200 OK", "[]").await;

    assert_matches!(
        resolve_device(&api, None).await,
        Err(MonitorError::NoDevices)
    );
}

#[tokio::test]
async fn hub_failure_surfaces_as_hub_error() {
    let api = hub_once("503 Service Unavailable", r#"{"detail":"starting"}"#).await;

    let err = resolve_device(&api, None).await.unwrap_err();
    assert_matches!(err, MonitorError::Hub(FetchError::Api { status: 503, .. }));
    assert!(err.to_string().starts_with("Sensor hub unavailable"));
}
