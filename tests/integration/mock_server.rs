//! Mock HTTP server setup for integration tests

use mockito::{Mock, Server, ServerGuard};
use vespa_knack::{DispatchSettings, KnackClient, KnackConfig};

pub const APP_ID: &str = "5f0000000000000000000001";
pub const API_KEY: &str = "test-rest-key";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

/// Millisecond-scale pacing so retries finish quickly on a real clock.
pub fn fast_settings() -> DispatchSettings {
    DispatchSettings {
        base_cooldown_ms: 1,
        cooldown_ceiling_ms: 20,
        base_delay_ms: 5,
        ..Default::default()
    }
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Config pointing both the platform and the proxy at the mock server.
    pub fn config(&self) -> KnackConfig {
        KnackConfig::builder(APP_ID, API_KEY)
            .api_base_url(&self.base_url)
            .proxy_base_url(&self.base_url)
            .dispatch(fast_settings())
            .build()
            .expect("valid test config")
    }

    pub fn client(&self) -> KnackClient {
        KnackClient::new(self.config()).expect("client")
    }

    /// Create a mock for a JSON response
    pub async fn mock_json(&mut self, method: &str, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }
}
