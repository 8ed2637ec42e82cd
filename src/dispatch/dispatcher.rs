use super::inflight::Registration;
use crate::cache::CacheKey;
use crate::error::preview;
use crate::resilience::{Decision, RetryPolicy};
use crate::session::SessionContext;
use crate::transport::{ApiRequest, Transport};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-call routing: which resource paces the call, how it can be cancelled,
/// and whether its result is cached.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub resource: String,
    pub request_key: Option<String>,
    pub scope: Option<String>,
    pub cache_key: Option<CacheKey>,
    /// Skip the cache read but still store the fresh result.
    pub refresh: bool,
}

impl DispatchOptions {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }

    pub fn request_key(mut self, key: impl Into<String>) -> Self {
        self.request_key = Some(key.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn cached(mut self, key: CacheKey) -> Self {
        self.cache_key = Some(key);
        self
    }

    pub fn refresh(mut self) -> Self {
        self.refresh = true;
        self
    }
}

/// Handle to an operation started with [`RequestDispatcher::spawn`].
pub struct OperationHandle {
    request_key: String,
    token: CancellationToken,
    join: JoinHandle<Result<Value>>,
}

impl OperationHandle {
    pub fn request_key(&self) -> &str {
        &self.request_key
    }

    /// Abort the operation. Its result is never delivered and the cache is not touched.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn join(self) -> Result<Value> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(Error::runtime_with_context(
                format!("dispatch task failed: {}", e),
                ErrorContext::new()
                    .with_request_key(self.request_key)
                    .with_source("dispatcher"),
            )),
        }
    }
}

/// Removes the in-flight entry when the call settles or its future is dropped.
struct InflightGuard {
    session: Arc<SessionContext>,
    registration: Registration,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.session.inflight().complete(&self.registration);
    }
}

/// Issues throttled, retried, cancellable calls through a [`Transport`].
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    session: Arc<SessionContext>,
    retry: RetryPolicy,
    debug: bool,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionContext>) -> Self {
        let retry = RetryPolicy::from_settings(session.settings());
        Self {
            transport,
            session,
            retry,
            debug: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Log every attempt with status and a body preview.
    pub fn with_debug(mut self, enable: bool) -> Self {
        self.debug = enable;
        self
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    fn register(&self, opts: &DispatchOptions) -> InflightGuard {
        let request_key = opts
            .request_key
            .clone()
            .unwrap_or_else(|| format!("{}:{}", opts.resource, Uuid::new_v4()));
        let registration =
            self.session
                .inflight()
                .register(&request_key, &opts.resource, opts.scope.as_deref());
        InflightGuard {
            session: self.session.clone(),
            registration,
        }
    }

    /// Run one logical call to completion.
    ///
    /// Dropping the returned future (a timeout, a losing `select!` branch)
    /// abandons the call and clears its in-flight entry.
    pub async fn send(&self, request: ApiRequest, opts: DispatchOptions) -> Result<Value> {
        let guard = self.register(&opts);
        self.drive(request, opts, guard).await
    }

    /// Start a call on the runtime and return a cancellable handle.
    ///
    /// The operation is registered before this returns, so cancelling the
    /// handle (or its request key, or its scope) immediately is always effective.
    pub fn spawn(&self, request: ApiRequest, opts: DispatchOptions) -> OperationHandle {
        let guard = self.register(&opts);
        let request_key = guard.registration.request_key.clone();
        let token = guard.registration.token().clone();
        let this = self.clone();
        let join = tokio::spawn(async move { this.drive(request, opts, guard).await });
        OperationHandle {
            request_key,
            token,
            join,
        }
    }

    async fn drive(
        &self,
        request: ApiRequest,
        opts: DispatchOptions,
        guard: InflightGuard,
    ) -> Result<Value> {
        let token = guard.registration.token().clone();
        let request_key = guard.registration.request_key.clone();

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled { request_key: request_key.clone() }),
            r = self.fetch(&request, &opts, &request_key) => r,
        };
        drop(guard);

        let (value, from_cache) = outcome?;
        if token.is_cancelled() {
            return Err(Error::Cancelled { request_key });
        }
        if let (Some(key), false) = (&opts.cache_key, from_cache) {
            if let Err(e) = self.session.cache().set(key, value.clone()).await {
                warn!(key = %key, error = %e, "cache write failed");
            }
        }
        Ok(value)
    }

    async fn fetch(
        &self,
        request: &ApiRequest,
        opts: &DispatchOptions,
        request_key: &str,
    ) -> Result<(Value, bool)> {
        if let (Some(key), false) = (&opts.cache_key, opts.refresh) {
            match self.session.cache().get(key).await {
                Ok(Some(hit)) => return Ok((hit, true)),
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "cache read failed"),
            }
        }
        let value = self.attempt_loop(request, &opts.resource, request_key).await?;
        Ok((value, false))
    }

    async fn attempt_loop(
        &self,
        request: &ApiRequest,
        resource: &str,
        request_key: &str,
    ) -> Result<Value> {
        let throttle = self.session.throttle();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            throttle.acquire(resource).await;
            let err = match self.transport.execute(request).await {
                Ok(value) => {
                    throttle.on_success(resource);
                    if self.debug {
                        debug!(
                            request = %request.label(),
                            resource,
                            attempt = attempt + 1,
                            "attempt succeeded"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if err.is_rate_limited() {
                let cooldown = throttle.on_rate_limited(resource);
                debug!(
                    resource,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "rate limited, cooldown extended"
                );
            }

            if self.debug {
                let body = match &err {
                    Error::Remote { body, .. } => preview(body),
                    other => other.to_string(),
                };
                debug!(
                    request = %request.label(),
                    resource,
                    attempt = attempt + 1,
                    max_attempts = self.retry.max_attempts(),
                    http_status = err.status(),
                    body = %body,
                    "attempt failed"
                );
            }

            match self.retry.decide(&err, attempt) {
                Decision::Retry { delay } => {
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Decision::Fail => {
                    info!(
                        request = %request.label(),
                        request_key,
                        resource,
                        attempts = attempt + 1,
                        http_status = err.status(),
                        duration_ms = started.elapsed().as_millis() as u64,
                        "request failed"
                    );
                    return Err(err);
                }
            }
        }
    }
}
