//! Rate limiting integration tests

use futures_util::future::join_all;

use super::common::*;

#[tokio::test]
async fn test_quota_then_throttle() {
    let server = TestServer::spawn_with_config(quota_config(3)).await;

    for expected_remaining in ["2", "1", "0"] {
        let response = server.get_as("/simulate/status?code=200", "alice").await;
        assert_status(&response, 200);
        assert_eq!(header(&response, "x-ratelimit-limit"), Some("3"));
        assert_eq!(header(&response, "x-ratelimit-remaining"), Some(expected_remaining));
        assert!(header(&response, "retry-after").is_none());
    }

    let response = server.get_as("/simulate/status?code=503", "alice").await;
    assert_status(&response, 429);
    // The requested scenario is still reported
    assert_eq!(header(&response, "x-scenario"), Some("503"));

    let retry_after: u64 = header(&response, "retry-after").unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));

    let body = json_body(response).await;
    assert_eq!(body["code"], 429);
    assert_eq!(body["remaining"], 0);
}

#[tokio::test]
async fn test_simulated_429_is_not_a_throttle() {
    let server = TestServer::spawn().await;

    let response = server.get_as("/simulate/status?code=429", "bob").await;
    assert_status(&response, 429);
    assert!(header(&response, "retry-after").is_none());
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("9"));
}

#[tokio::test]
async fn test_clients_are_independent() {
    let server = TestServer::spawn_with_config(quota_config(1)).await;

    assert_status(&server.get_as("/simulate/status?code=200", "a").await, 200);
    assert_status(&server.get_as("/simulate/status?code=200", "a").await, 429);
    assert_status(&server.get_as("/simulate/status?code=200", "b").await, 200);
}

#[tokio::test]
async fn test_peer_address_is_the_fallback_key() {
    let server = TestServer::spawn_with_config(quota_config(1)).await;

    assert_status(&server.get("/simulate/status?code=200").await, 200);
    assert_status(&server.get("/simulate/status?code=200").await, 429);

    let buckets = server.state.engine.rate_limiter().bucket_count();
    assert_eq!(buckets, 1);
}

#[tokio::test]
async fn test_rejected_requests_are_not_charged() {
    let server = TestServer::spawn_with_config(quota_config(1)).await;

    assert_status(&server.get_as("/simulate/fault/explode", "c").await, 400);
    assert_status(&server.get_as("/simulate/status?code=999", "c").await, 400);
    assert_status(&server.get_as("/simulate/status?code=200", "c").await, 200);
}

#[tokio::test]
async fn test_reset_endpoint() {
    let server = TestServer::spawn_with_config(quota_config(1)).await;

    server.get_as("/simulate/status?code=200", "carol").await;
    assert_status(&server.get_as("/simulate/status?code=200", "carol").await, 429);

    let response = server.post_as("/simulate/rate-limit/reset", "carol").await;
    assert_status(&response, 200);
    let body = json_body(response).await;
    assert_eq!(body["client_id"], "carol");
    assert_eq!(body["existed"], true);

    assert_status(&server.get_as("/simulate/status?code=200", "carol").await, 200);
}

#[tokio::test]
async fn test_concurrent_requests_respect_quota() {
    let server = TestServer::spawn_with_config(quota_config(5)).await;

    let requests = (0..20).map(|_| server.get_as("/simulate/status?code=200", "burst"));
    let statuses: Vec<u16> = join_all(requests)
        .await
        .iter()
        .map(|r| r.status().as_u16())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 5);
    assert_eq!(statuses.iter().filter(|s| **s == 429).count(), 15);
}

#[tokio::test]
async fn test_disabled_rate_limit() {
    let mut config = quota_config(1);
    config.rate_limit.enabled = false;
    let server = TestServer::spawn_with_config(config).await;

    for _ in 0..3 {
        let response = server.get_as("/simulate/status?code=200", "d").await;
        assert_status(&response, 200);
        assert!(header(&response, "x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn test_metrics_and_stats_count_throttles() {
    let server = TestServer::spawn_with_config(quota_config(1)).await;

    server.get_as("/simulate/status?code=200", "e").await;
    server.get_as("/simulate/status?code=200", "e").await;

    let metrics = server.get("/metrics").await.text().await.unwrap();
    assert!(metrics.contains("failsim_throttled_total 1"));
    assert!(metrics.contains("failsim_rate_limit_buckets 1"));

    let stats = json_body(server.get("/admin/stats").await).await;
    assert_eq!(stats["engine"]["total_requests"], 2);
    assert_eq!(stats["engine"]["throttled"], 1);
}

#[tokio::test]
async fn test_rate_limit_exercise_endpoint() {
    let server = TestServer::spawn_with_config(quota_config(3)).await;

    for (count, remaining) in [(1, 2), (2, 1), (3, 0)] {
        let response = server.get_as("/simulate/rate-limit", "frank").await;
        assert_status(&response, 200);
        assert_eq!(header(&response, "x-ratelimit-remaining"), Some(remaining.to_string().as_str()));

        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["rate_limit_info"]["limit"], 3);
        assert_eq!(body["rate_limit_info"]["remaining"], remaining);
        assert_eq!(body["rate_limit_info"]["window"], 60);
        assert_eq!(body["rate_limit_info"]["current_count"], count);
    }

    let response = server.get_as("/simulate/rate-limit?limit=3&window=60", "frank").await;
    assert_status(&response, 429);
    assert!(header(&response, "retry-after").is_some());
    let body = json_body(response).await;
    assert_eq!(body["limit"], 3);
    assert_eq!(body["window"], 60);
}

#[tokio::test]
async fn test_rate_limit_exercise_reset_counts() {
    let server = TestServer::spawn_with_config(quota_config(1)).await;

    assert_status(&server.get_as("/simulate/rate-limit", "grace").await, 200);
    assert_status(&server.get_as("/simulate/rate-limit", "grace").await, 429);

    let response = server.get_as("/simulate/rate-limit?reset_counts=true", "grace").await;
    assert_status(&response, 200);
    let body = json_body(response).await;
    assert_eq!(body["status"], "reset");
    assert_eq!(body["existed"], true);

    let body = json_body(server.get_as("/simulate/rate-limit", "grace").await).await;
    assert_eq!(body["rate_limit_info"]["current_count"], 1);
}

#[tokio::test]
async fn test_rate_limit_exercise_rejects_other_limits() {
    let server = TestServer::spawn_with_config(quota_config(3)).await;

    let response = server.get_as("/simulate/rate-limit?limit=5", "heidi").await;
    assert_status(&response, 400);
    assert_eq!(json_body(response).await["error"]["param"], "limit");

    let response = server.get_as("/simulate/rate-limit?window=10", "heidi").await;
    assert_status(&response, 400);
    assert_eq!(json_body(response).await["error"]["param"], "window");

    // Refused requests are not charged
    assert_eq!(server.state.engine.rate_limiter().bucket_count(), 0);
}

#[tokio::test]
async fn test_rate_limit_exercise_without_limiter() {
    let mut config = quota_config(1);
    config.rate_limit.enabled = false;
    let server = TestServer::spawn_with_config(config).await;

    let body = json_body(server.get_as("/simulate/rate-limit", "ivan").await).await;
    assert_eq!(body["status"], "success");
    assert!(body["rate_limit_info"].is_null());
}
