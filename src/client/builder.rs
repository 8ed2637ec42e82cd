use crate::client::core::KnackClient;
use crate::config::KnackConfig;
use crate::dispatch::RequestDispatcher;
use crate::resilience::RetryPolicy;
use crate::session::SessionContext;
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;

/// Builder for creating clients with custom configuration.
///
/// Defaults: HTTP transport from the config, a fresh session, retry policy
/// from `config.dispatch`.
pub struct KnackClientBuilder {
    config: KnackConfig,
    transport: Option<Arc<dyn Transport>>,
    session: Option<Arc<SessionContext>>,
    retry: Option<RetryPolicy>,
    scope: Option<String>,
}

impl KnackClientBuilder {
    pub fn new(config: KnackConfig) -> Self {
        Self {
            config,
            transport: None,
            session: None,
            retry: None,
            scope: None,
        }
    }

    /// Replace the network layer (mock servers, recorded fixtures).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing session, e.g. with a [`crate::proxy::ProxyClient`].
    pub fn session(mut self, session: Arc<SessionContext>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Build the client. Fails if the configuration is invalid.
    pub fn build(self) -> Result<KnackClient> {
        self.config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::for_platform(&self.config)?),
        };
        let session = self
            .session
            .unwrap_or_else(|| SessionContext::shared(self.config.dispatch.clone()));

        let mut dispatcher =
            RequestDispatcher::new(transport, session).with_debug(self.config.debug);
        if let Some(retry) = self.retry {
            dispatcher = dispatcher.with_retry(retry);
        }

        Ok(KnackClient {
            config: Arc::new(self.config),
            dispatcher,
            scope: self.scope,
        })
    }
}
