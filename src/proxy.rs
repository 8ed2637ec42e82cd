//! Backend proxy endpoints: templated email, dashboard data and AI-query
//! passthrough. Proxy calls carry no platform credentials.
//!
//! Email is ancillary: [`ProxyClient::notify`] logs and swallows failures
//! because the primary operation it reports on has already succeeded.

use crate::config::KnackConfig;
use crate::dispatch::{DispatchOptions, RequestDispatcher};
use crate::session::SessionContext;
use crate::transport::{ApiRequest, HttpTransport, Transport};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

const EMAIL_RESOURCE: &str = "proxy:email";
const DASHBOARD_RESOURCE: &str = "proxy:dashboard";
const AI_RESOURCE: &str = "proxy:ai";

/// Paths of the proxy endpoints, relative to the proxy base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyEndpoints {
    pub email: String,
    pub dashboard_data: String,
    pub ai_query: String,
}

impl Default for ProxyEndpoints {
    fn default() -> Self {
        Self {
            email: "api/send-email".to_string(),
            dashboard_data: "api/dashboard-data".to_string(),
            ai_query: "api/dashboard-ai-query".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            template: None,
            data: Value::Null,
        }
    }

    pub fn cc(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    pub fn template(mut self, template: impl Into<String>, data: Value) -> Self {
        self.template = Some(template.into());
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiQuery {
    pub question: String,
    #[serde(default)]
    pub context: Value,
}

pub struct ProxyClient {
    dispatcher: RequestDispatcher,
    endpoints: ProxyEndpoints,
}

impl ProxyClient {
    /// HTTP proxy client sharing `session` with the records client.
    pub fn new(config: &KnackConfig, session: Arc<SessionContext>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::for_proxy(config)?);
        Ok(Self::with_transport(transport, session).with_debug(config.debug))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, session: Arc<SessionContext>) -> Self {
        Self {
            dispatcher: RequestDispatcher::new(transport, session),
            endpoints: ProxyEndpoints::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: ProxyEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_debug(mut self, enable: bool) -> Self {
        self.dispatcher = self.dispatcher.with_debug(enable);
        self
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub async fn send_email(&self, message: &EmailMessage) -> Result<Value> {
        let req = ApiRequest::post(self.endpoints.email.clone())
            .with_body(serde_json::to_value(message)?);
        self.dispatcher
            .send(req, DispatchOptions::new(EMAIL_RESOURCE))
            .await
    }

    /// Best-effort email. Never fails; returns whether the proxy accepted it.
    pub async fn notify(&self, message: &EmailMessage) -> bool {
        match self.send_email(message).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    subject = message.subject.as_str(),
                    recipients = message.to.len(),
                    error = %e,
                    "notification email failed"
                );
                false
            }
        }
    }

    pub async fn dashboard_data(&self, query: &Value) -> Result<Value> {
        let req = ApiRequest::post(self.endpoints.dashboard_data.clone()).with_body(query.clone());
        self.dispatcher
            .send(req, DispatchOptions::new(DASHBOARD_RESOURCE))
            .await
    }

    pub async fn ai_query(&self, query: &AiQuery) -> Result<Value> {
        let req = ApiRequest::post(self.endpoints.ai_query.clone())
            .with_body(serde_json::to_value(query)?);
        self.dispatcher
            .send(req, DispatchOptions::new(AI_RESOURCE))
            .await
    }
}
