//! Status-code scenario integration tests

use super::common::*;

#[tokio::test]
async fn test_curated_status() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/status?code=503").await;
    assert_status(&response, 503);
    assert_eq!(header(&response, "x-scenario"), Some("503"));
    assert_eq!(header(&response, "content-type"), Some("application/json"));
    assert!(header(&response, "x-request-id").unwrap().starts_with("req_"));

    let body = json_body(response).await;
    assert_eq!(body["error"], "Service Unavailable");
    assert_eq!(body["code"], 503);
    assert!(body["fix"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn test_default_code_is_bad_request() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/status").await;
    assert_status(&response, 400);
    assert_eq!(header(&response, "x-scenario"), Some("400"));
}

#[tokio::test]
async fn test_same_scenario_same_content() {
    let server = TestServer::spawn().await;

    let first = json_body(server.get("/simulate/status?code=404").await).await;
    let second = json_body(server.get("/simulate/status?code=404").await).await;

    assert_eq!(first["error"], second["error"]);
    assert_eq!(first["message"], second["message"]);
    assert_eq!(first["fix"], second["fix"]);
    assert_ne!(first["request_id"], second["request_id"]);
}

#[tokio::test]
async fn test_debug_headers() {
    let server = TestServer::spawn().await;

    let with = server.get("/simulate/status?code=422").await;
    assert_eq!(header(&with, "x-debug-mode"), Some("true"));
    assert_eq!(header(&with, "x-scenario-category"), Some("client-error"));
    assert!(header(&with, "x-debug-tip").is_some());

    let without = server.get("/simulate/status?code=422&include_headers=false").await;
    assert_status(&without, 422);
    assert!(header(&without, "x-debug-mode").is_none());
    assert!(header(&without, "x-debug-tip").is_none());
}

#[tokio::test]
async fn test_unauthorized_challenge() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/status?code=401").await;
    assert_status(&response, 401);
    assert_eq!(header(&response, "www-authenticate"), Some("Bearer"));
}

#[tokio::test]
async fn test_no_content_has_empty_body() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/status?code=204").await;
    assert_status(&response, 204);
    assert!(header(&response, "content-type").is_none());
    assert!(response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_uncurated_code_is_synthesized() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/status?code=418").await;
    assert_status(&response, 418);
    assert_eq!(header(&response, "x-scenario-category"), Some("client-error"));

    let body = json_body(response).await;
    assert_eq!(body["code"], 418);
}

#[tokio::test]
async fn test_message_override() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/status?code=500&message=disk%20full").await;
    let body = json_body(response).await;
    assert_eq!(body["message"], "disk full");
}

#[tokio::test]
async fn test_out_of_range_code_rejected() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/status?code=600").await;
    assert_status(&response, 400);
    assert!(header(&response, "x-scenario").is_none());

    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "invalid_parameters");
    assert_eq!(body["error"]["param"], "code");
}

#[tokio::test]
async fn test_unparseable_code_gets_error_envelope() {
    let server = TestServer::spawn().await;

    for query in ["code=abc", "code=70000", "code=-5"] {
        let response = server.get(&format!("/simulate/status?{}", query)).await;
        assert_status(&response, 400);
        assert_eq!(header(&response, "content-type"), Some("application/json"));

        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "invalid_parameters", "{}", query);
        assert_eq!(body["error"]["param"], "code", "{}", query);
    }

    let stats = json_body(server.get("/admin/stats").await).await;
    assert_eq!(stats["engine"]["rejected"], 3);

    let metrics = server.get("/metrics").await.text().await.unwrap();
    assert!(metrics.contains("failsim_errors_total 3"));
}

#[tokio::test]
async fn test_malformed_fault_query_gets_error_envelope() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/slow?jitter=maybe").await;
    assert_status(&response, 400);

    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "invalid_parameters");
    assert_eq!(body["error"]["param"], "query");
}

#[tokio::test]
async fn test_informational_code_rejected() {
    let server = TestServer::spawn().await;

    let response = server.get("/simulate/status?code=102").await;
    assert_status(&response, 400);
    assert!(header(&response, "x-scenario").is_none());
}

#[tokio::test]
async fn test_random_honors_exclusions() {
    let server = TestServer::spawn().await;

    for _ in 0..5 {
        let response = server
            .get("/simulate/random?exclude_codes=400,401,403,404,422,429,500,502,503")
            .await;
        assert_status(&response, 504);
        assert_eq!(header(&response, "x-debug-mode"), Some("true"));
    }
}

#[tokio::test]
async fn test_random_excluding_everything_falls_back() {
    let server = TestServer::spawn().await;

    let response = server
        .get("/simulate/random?exclude_codes=400,401,403,404,422,429,500,502,503,504")
        .await;
    assert_status(&response, 500);
}

#[tokio::test]
async fn test_scenarios_listing() {
    let server = TestServer::spawn().await;

    let response = server.get("/scenarios").await;
    assert_status(&response, 200);

    let body = json_body(response).await;
    let scenarios = body["scenarios"].as_array().unwrap();
    assert_eq!(body["count"].as_u64().unwrap() as usize, scenarios.len());
    assert!(scenarios.iter().any(|s| s["id"] == "429"));
    assert!(scenarios.iter().any(|s| s["id"] == "malformed-json"));
}

#[tokio::test]
async fn test_health_and_version() {
    let server = TestServer::spawn().await;

    let health = json_body(server.get("/health").await).await;
    assert_eq!(health["status"], "healthy");

    let version = json_body(server.get("/version").await).await;
    assert_eq!(version["name"], "api-failure-simulator");
}
