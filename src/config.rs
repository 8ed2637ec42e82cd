//! Client configuration.
//!
//! [`KnackConfig`] is validated once at construction; a client is never built
//! from a config with missing credentials. Values can come from the builder,
//! a YAML document, or environment overrides:
//!
//! - `VESPA_KNACK_APP_ID`, `VESPA_KNACK_API_KEY`, `VESPA_KNACK_USER_TOKEN`
//! - `VESPA_HTTP_TIMEOUT_SECS`
//! - `VESPA_PROXY_URL`

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.knack.com/v1";

/// Pacing, retry and cache knobs for the request dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Starting minimum spacing between dispatches to one resource key.
    pub base_cooldown_ms: u64,
    /// Upper bound the cooldown can grow to after rate-limit responses.
    pub cooldown_ceiling_ms: u64,
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Backoff unit: attempt `i` is followed by a wait of `base_delay_ms * 2^i`.
    pub base_delay_ms: u64,
    pub cache_ttl_ms: u64,
    pub debounce_window_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            base_cooldown_ms: 1_000,
            cooldown_ceiling_ms: 10_000,
            max_attempts: 3,
            base_delay_ms: 1_000,
            cache_ttl_ms: 10_000,
            debounce_window_ms: 300,
        }
    }
}

impl DispatchSettings {
    pub fn base_cooldown(&self) -> Duration {
        Duration::from_millis(self.base_cooldown_ms)
    }

    pub fn cooldown_ceiling(&self) -> Duration {
        Duration::from_millis(self.cooldown_ceiling_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts must be at least 1", "dispatch.max_attempts"));
        }
        if self.cooldown_ceiling_ms < self.base_cooldown_ms {
            return Err(invalid(
                "cooldown ceiling must not be below the base cooldown",
                "dispatch.cooldown_ceiling_ms",
            ));
        }
        if self.cache_ttl_ms == 0 {
            return Err(invalid("cache TTL must be positive", "dispatch.cache_ttl_ms"));
        }
        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct KnackConfig {
    pub app_id: String,
    pub api_key: String,
    #[serde(default)]
    pub user_token: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub proxy_base_url: Option<String>,
    /// Enables per-attempt debug logging in the dispatcher.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub dispatch: DispatchSettings,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn invalid(message: &str, field: &str) -> Error {
    Error::configuration_with_context(
        message,
        ErrorContext::new()
            .with_field_path(format!("config.{}", field))
            .with_source("config_validator"),
    )
}

impl std::fmt::Debug for KnackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnackConfig")
            .field("app_id", &self.app_id)
            .field("api_key", &"<redacted>")
            .field("user_token", &self.user_token.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("proxy_base_url", &self.proxy_base_url)
            .field("debug", &self.debug)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("dispatch", &self.dispatch)
            .finish()
    }
}

impl KnackConfig {
    pub fn builder(app_id: impl Into<String>, api_key: impl Into<String>) -> KnackConfigBuilder {
        KnackConfigBuilder::new(app_id, api_key)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let mut config: KnackConfig = serde_yaml::from_str(raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Environment values win over file values; unparsable numbers are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VESPA_KNACK_APP_ID") {
            self.app_id = v;
        }
        if let Ok(v) = std::env::var("VESPA_KNACK_API_KEY") {
            self.api_key = v;
        }
        if let Ok(v) = std::env::var("VESPA_KNACK_USER_TOKEN") {
            self.user_token = Some(v);
        }
        if let Some(secs) = std::env::var("VESPA_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.http_timeout_secs = secs;
        }
        if let Ok(v) = std::env::var("VESPA_PROXY_URL") {
            self.proxy_base_url = Some(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            return Err(invalid("application id is required", "app_id"));
        }
        if self.api_key.trim().is_empty() {
            return Err(invalid("REST API key is required", "api_key"));
        }
        if self.http_timeout_secs == 0 {
            return Err(invalid("HTTP timeout must be positive", "http_timeout_secs"));
        }
        check_url(&self.api_base_url, "api_base_url")?;
        if let Some(proxy) = &self.proxy_base_url {
            check_url(proxy, "proxy_base_url")?;
        }
        self.dispatch.validate()
    }
}

fn check_url(raw: &str, field: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid URL: {}", e),
            ErrorContext::new()
                .with_field_path(format!("config.{}", field))
                .with_details(raw.to_string())
                .with_source("config_validator"),
        )
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(&format!("unsupported URL scheme '{}'", other), field)),
    }
}

/// Builder for [`KnackConfig`]. `build` validates.
pub struct KnackConfigBuilder {
    config: KnackConfig,
}

impl KnackConfigBuilder {
    pub fn new(app_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            config: KnackConfig {
                app_id: app_id.into(),
                api_key: api_key.into(),
                user_token: None,
                api_base_url: default_api_base_url(),
                proxy_base_url: None,
                debug: false,
                http_timeout_secs: default_timeout_secs(),
                dispatch: DispatchSettings::default(),
            },
        }
    }

    pub fn user_token(mut self, token: impl Into<String>) -> Self {
        self.config.user_token = Some(token.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn proxy_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.proxy_base_url = Some(url.into());
        self
    }

    pub fn debug(mut self, enable: bool) -> Self {
        self.config.debug = enable;
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs;
        self
    }

    pub fn dispatch(mut self, settings: DispatchSettings) -> Self {
        self.config.dispatch = settings;
        self
    }

    pub fn build(self) -> Result<KnackConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
