use super::{ApiRequest, Transport, TransportError};
use crate::config::KnackConfig;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use std::time::Duration;

/// Credentials attached to every platform call.
#[derive(Clone)]
pub struct KnackAuth {
    pub app_id: String,
    pub api_key: String,
    pub user_token: Option<String>,
}

impl std::fmt::Debug for KnackAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnackAuth")
            .field("app_id", &self.app_id)
            .field("api_key", &"<redacted>")
            .field("user_token", &self.user_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    auth: Option<KnackAuth>,
}

impl HttpTransport {
    pub fn new(base_url: &str, auth: Option<KnackAuth>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Transport for the platform REST API, authenticated with the configured credentials.
    pub fn for_platform(config: &KnackConfig) -> Result<Self> {
        let auth = KnackAuth {
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
            user_token: config.user_token.clone(),
        };
        Self::new(&config.api_base_url, Some(auth), config.http_timeout())
    }

    /// Transport for the backend proxy. Proxy calls carry no credentials.
    pub fn for_proxy(config: &KnackConfig) -> Result<Self> {
        let base = config.proxy_base_url.as_deref().ok_or_else(|| {
            Error::configuration_with_context(
                "proxy base URL is not configured",
                ErrorContext::new()
                    .with_field_path("config.proxy_base_url")
                    .with_source("http_transport"),
            )
        })?;
        Self::new(base, None, config.http_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Best-effort parsing of `Retry-After: <seconds>`.
    fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
        let raw = headers.get("retry-after")?.to_str().ok()?;
        let secs: u64 = raw.trim().parse().ok()?;
        Some(secs.saturating_mul(1000))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<serde_json::Value> {
        let url = self.url_for(&request.path);
        let mut req = self.client.request(request.method.clone(), &url);

        if let Some(auth) = &self.auth {
            req = req
                .header("X-Knack-Application-Id", &auth.app_id)
                .header("X-Knack-REST-API-Key", &auth.api_key)
                .header(CONTENT_TYPE, "application/json");
            if let Some(token) = &auth.user_token {
                req = req.header("Authorization", token);
            }
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(TransportError::Http)?;
        let status = resp.status();
        let retry_after_ms = Self::retry_after_ms(resp.headers());
        let body = resp.text().await.map_err(TransportError::Http)?;

        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
                retry_after_ms,
            });
        }

        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
