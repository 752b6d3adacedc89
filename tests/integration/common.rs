//! Common test utilities for integration tests
//!
//! Provides test server spawning and request helpers.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::sync::oneshot;

use api_failure_simulator::{
    config::SimulatorConfig,
    server::{create_router, AppState},
};

/// Test server wrapper
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub base_url: String,
    pub state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawn a test server with default configuration
    pub async fn spawn() -> Self {
        Self::spawn_with_config(SimulatorConfig::default()).await
    }

    /// Spawn a test server with custom configuration
    pub async fn spawn_with_config(mut config: SimulatorConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        config.server.host = "127.0.0.1".to_string();
        config.server.port = addr.port();

        let state = AppState::new(config);
        let app = create_router(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        let base_url = format!("http://{}", addr);

        // /version is not charged against any bucket
        for _ in 0..50 {
            if client.get(format!("{}/version", base_url)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Self {
            addr,
            client,
            base_url,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// Send a GET request identified by an API key
    pub async fn get_as(&self, path: &str, api_key: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-api-key", api_key)
            .send()
            .await
            .unwrap()
    }

    /// Send an empty POST request identified by an API key
    pub async fn post_as(&self, path: &str, api_key: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-api-key", api_key)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Configuration with short delays so fault tests stay fast
pub fn fast_config() -> SimulatorConfig {
    let mut config = SimulatorConfig::default();
    config.delay.timeout_delay = Duration::from_millis(200);
    config.delay.slow_delay = Duration::from_millis(200);
    config.delay.max_delay = Duration::from_secs(1);
    config
}

/// Configuration with a small quota
pub fn quota_config(quota: u32) -> SimulatorConfig {
    let mut config = SimulatorConfig::default();
    config.rate_limit.quota = quota;
    config
}

/// Header value as a string
pub fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Assert response status
pub fn assert_status(response: &reqwest::Response, expected: u16) {
    assert_eq!(
        response.status().as_u16(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Parse response body as JSON
pub async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.unwrap()
}
