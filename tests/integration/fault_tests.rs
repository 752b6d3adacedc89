//! Named-fault integration tests

use std::time::{Duration, Instant};

use super::common::*;
use api_failure_simulator::catalog::JsonDefect;

#[tokio::test]
async fn test_malformed_json_default() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/fault/malformed-json").await;
    assert_status(&response, 200);
    assert_eq!(header(&response, "content-type"), Some("application/json"));
    assert_eq!(header(&response, "x-json-error-type"), Some("missing_comma"));
    assert_eq!(header(&response, "x-expected-error"), Some("JSON parse error"));

    let body = response.text().await.unwrap();
    assert_eq!(body, JsonDefect::MissingComma.body());
    assert!(serde_json::from_str::<serde_json::Value>(&body).is_err());
}

#[tokio::test]
async fn test_malformed_json_is_deterministic() {
    let server = TestServer::spawn().await;

    let first = server.get("/simulate/fault/malformed_json?variant=unclosed_brace").await;
    let second = server.get("/simulate/fault/MALFORMED-JSON?variant=unclosed_brace").await;

    assert_eq!(
        first.text().await.unwrap(),
        second.text().await.unwrap()
    );
}

#[tokio::test]
async fn test_invalid_json_alias() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/invalid-json?error_type=trailing_comma").await;
    assert_status(&response, 200);
    assert_eq!(header(&response, "x-scenario"), Some("malformed-json"));
    assert_eq!(response.text().await.unwrap(), JsonDefect::TrailingComma.body());
}

#[tokio::test]
async fn test_unknown_variant_falls_back() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/invalid-json?error_type=nonsense").await;
    assert_eq!(header(&response, "x-json-error-type"), Some("missing_comma"));
}

#[tokio::test]
async fn test_truncated_response() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/fault/truncated-response").await;
    assert_status(&response, 200);
    let body = response.text().await.unwrap();
    assert!(body.starts_with('{'));
    assert!(serde_json::from_str::<serde_json::Value>(&body).is_err());
}

#[tokio::test]
async fn test_timeout_fault() {
    let server = TestServer::spawn_with_config(fast_config()).await;

    let start = Instant::now();
    let response = server.get("/simulate/fault/timeout").await;
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_status(&response, 504);

    let body = json_body(response).await;
    assert_eq!(body["code"], 504);
    assert_eq!(body["delay_seconds"], 0.2);
}

#[tokio::test]
async fn test_slow_fault_with_override() {
    let server = TestServer::spawn_with_config(fast_config()).await;

    let start = Instant::now();
    let response = server.get("/simulate/slow?seconds=0.3").await;
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert_status(&response, 200);

    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["requested_delay"], 0.3);
    assert_eq!(body["jitter_applied"], false);
}

#[tokio::test]
async fn test_delay_override_is_capped() {
    let server = TestServer::spawn_with_config(fast_config()).await;

    let start = Instant::now();
    let response = server.get("/simulate/timeout?seconds=120").await;
    let elapsed = start.elapsed();

    assert_status(&response, 504);
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(10));
}

#[tokio::test]
async fn test_delays_do_not_block_other_requests() {
    let server = TestServer::spawn_with_config(fast_config()).await;

    let slow = server.client.get(server.url("/simulate/slow?seconds=1")).send();
    let fast = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let start = Instant::now();
        let response = server.get("/simulate/status?code=500").await;
        (start.elapsed(), response.status().as_u16())
    };

    let (slow, (fast_elapsed, fast_status)) = tokio::join!(slow, fast);
    assert_eq!(slow.unwrap().status().as_u16(), 200);
    assert_eq!(fast_status, 500);
    assert!(fast_elapsed < Duration::from_millis(500));
}

#[tokio::test]
async fn test_negative_delay_rejected() {
    let server = TestServer::spawn_with_config(fast_config()).await;

    let response = server.get("/simulate/slow?seconds=-1").await;
    assert_status(&response, 400);
}

#[tokio::test]
async fn test_network_errors() {
    let server = TestServer::spawn().await;

    assert_status(&server.get("/simulate/network-error").await, 500);
    assert_status(&server.get("/simulate/network-error?error_type=dns_failure").await, 502);
    assert_status(&server.get("/simulate/network-error?error_type=ssl_error").await, 502);
    assert_status(&server.get("/simulate/network-error?error_type=timeout").await, 400);
}

#[tokio::test]
async fn test_unknown_fault_rejected() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/fault/explode").await;
    assert_status(&response, 400);
    assert!(header(&response, "x-scenario").is_none());

    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "unknown_scenario");
}
