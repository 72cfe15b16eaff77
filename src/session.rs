//! HTTP sessions and the resilient request executor
//!
//! A [`Session`] issues one call per [`RequestDescriptor`] and never lets a transport
//! failure escape as an error unless it was configured to: a failed call becomes a
//! [`ResponseRecord`] carrying [`TRANSPORT_FAILURE_STATUS`] and the error text, so a
//! batch of calls can always run to completion.
//!
//! Sessions that carry an [`Authenticator`] react to a 401 by refreshing their
//! authorization headers once and replaying the call once. Refreshes are
//! single-flight: when many in-flight calls see the same 401, only the first one
//! re-authenticates and the rest replay with the fresh headers.

use crate::config::SessionConfig;
use crate::descriptor::{RequestDescriptor, RequestOptions};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// Synthetic status code for calls that never produced an HTTP response
pub const TRANSPORT_FAILURE_STATUS: u16 = 666;

/// Outcome of one HTTP call
#[derive(Clone, Debug)]
pub struct ResponseRecord {
    /// The URL that was requested
    pub target: Url,
    /// HTTP status, or [`TRANSPORT_FAILURE_STATUS`]
    pub status: u16,
    /// Response body (the error text for transport failures)
    pub body: Vec<u8>,
    /// Response headers (empty for transport failures)
    pub headers: HeaderMap,
}

impl ResponseRecord {
    /// Record a call that failed before any response arrived
    pub fn transport_failure(target: Url, message: impl Into<String>) -> Self {
        Self {
            target,
            status: TRANSPORT_FAILURE_STATUS,
            body: message.into().into_bytes(),
            headers: HeaderMap::new(),
        }
    }

    /// True when this record stands in for a transport failure
    pub fn is_transport_failure(&self) -> bool {
        self.status == TRANSPORT_FAILURE_STATUS
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for client errors, server errors and transport failures
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Produces fresh authorization headers for a session
///
/// Implement this for whatever identity provider a tool talks to. The returned
/// headers replace same-named headers on the session.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate and return the headers to attach to subsequent calls
    async fn authenticate(&self) -> Result<HeaderMap>;
}

/// Capability interface for anything that can issue descriptor-based calls
#[async_trait]
pub trait Session: Send + Sync {
    /// Session settings (concurrency cap, progress, raise mode)
    fn config(&self) -> &SessionConfig;

    /// Issue one call
    ///
    /// Returns `Err` only for transport failures in raise mode; every HTTP status,
    /// including 4xx and 5xx, is returned as a record.
    async fn execute(&self, method: Method, descriptor: &RequestDescriptor)
    -> Result<ResponseRecord>;

    /// Whether this session can refresh its authorization
    fn can_refresh_authorization(&self) -> bool {
        false
    }

    /// Refresh authorization headers now
    ///
    /// Returns `Ok(false)` when the session has no authentication capability.
    async fn refresh_authorization(&self) -> Result<bool> {
        Ok(false)
    }
}

/// `reqwest`-backed session with optional re-authentication
pub struct HttpSession {
    client: reqwest::Client,
    config: SessionConfig,
    authenticator: Option<Arc<dyn Authenticator>>,
    auth_headers: RwLock<HeaderMap>,
    refresh_lock: Mutex<()>,
    auth_generation: AtomicU64,
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("config", &self.config)
            .field("authenticated", &self.authenticator.is_some())
            .field("auth_generation", &self.auth_generation.load(Ordering::Relaxed))
            .finish()
    }
}

impl HttpSession {
    /// Build a session with its own HTTP client
    pub fn new(config: SessionConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, config))
    }

    /// Build a session around an existing client
    pub fn with_client(client: reqwest::Client, config: SessionConfig) -> Self {
        Self {
            client,
            config,
            authenticator: None,
            auth_headers: RwLock::new(HeaderMap::new()),
            refresh_lock: Mutex::new(()),
            auth_generation: AtomicU64::new(0),
        }
    }

    /// Attach an authenticator, enabling refresh-and-retry on 401
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Snapshot of the authorization headers currently attached to calls
    pub async fn auth_headers(&self) -> HeaderMap {
        self.auth_headers.read().await.clone()
    }

    /// GET `url`
    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<ResponseRecord> {
        self.call(Method::GET, url, options).await
    }

    /// POST `url`
    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<ResponseRecord> {
        self.call(Method::POST, url, options).await
    }

    /// PUT `url`
    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<ResponseRecord> {
        self.call(Method::PUT, url, options).await
    }

    /// PATCH `url`
    pub async fn patch(&self, url: &str, options: RequestOptions) -> Result<ResponseRecord> {
        self.call(Method::PATCH, url, options).await
    }

    /// DELETE `url`
    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<ResponseRecord> {
        self.call(Method::DELETE, url, options).await
    }

    async fn call(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<ResponseRecord> {
        let descriptor = RequestDescriptor::new(url, options)?;
        self.execute(method, &descriptor).await
    }

    async fn send(
        &self,
        method: Method,
        descriptor: &RequestDescriptor,
    ) -> std::result::Result<ResponseRecord, reqwest::Error> {
        let mut request = self.client.request(method, descriptor.target().clone());

        let query = descriptor.query();
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = descriptor.json_body() {
            request = request.json(body);
        }
        if let Some(form) = descriptor.form_body() {
            request = request.form(&form);
        }
        {
            let auth = self.auth_headers.read().await;
            if !auth.is_empty() {
                request = request.headers(auth.clone());
            }
        }
        for (name, value) in descriptor.headers() {
            request = request.header(name, value);
        }
        if let Some(timeout) = descriptor.timeout() {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(url = %descriptor.target(), status, "request completed");

        Ok(ResponseRecord {
            target: descriptor.target().clone(),
            status,
            body,
            headers,
        })
    }

    /// Send once, turning a transport error into a sentinel record unless raising
    async fn send_recorded(
        &self,
        method: Method,
        descriptor: &RequestDescriptor,
    ) -> Result<ResponseRecord> {
        match self.send(method, descriptor).await {
            Ok(record) => Ok(record),
            Err(e) if self.config.raise_on_transport_error => Err(Error::Network(e)),
            Err(e) => {
                let message = error_chain(&e);
                tracing::warn!(
                    url = %descriptor.target(),
                    error = %message,
                    "request failed, recording transport failure"
                );
                Ok(ResponseRecord::transport_failure(
                    descriptor.target().clone(),
                    message,
                ))
            }
        }
    }

    /// Re-authenticate unless another caller already did so since `observed`
    async fn refresh_since(&self, authenticator: &dyn Authenticator, observed: u64) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        if self.auth_generation.load(Ordering::Acquire) != observed {
            tracing::debug!("authorization already refreshed by a concurrent call");
            return Ok(());
        }

        let headers = authenticator.authenticate().await?;
        self.auth_headers.write().await.extend(headers);
        let generation = self.auth_generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(generation, "authorization refreshed");
        Ok(())
    }
}

#[async_trait]
impl Session for HttpSession {
    fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn execute(
        &self,
        method: Method,
        descriptor: &RequestDescriptor,
    ) -> Result<ResponseRecord> {
        let observed = self.auth_generation.load(Ordering::Acquire);
        let response = self.send_recorded(method.clone(), descriptor).await?;

        if response.status != StatusCode::UNAUTHORIZED.as_u16() {
            return Ok(response);
        }
        let Some(authenticator) = self.authenticator.as_deref() else {
            return Ok(response);
        };

        if let Err(e) = self.refresh_since(authenticator, observed).await {
            tracing::warn!(
                url = %descriptor.target(),
                error = %e,
                "authorization refresh failed, returning original response"
            );
            return Ok(response);
        }

        tracing::debug!(url = %descriptor.target(), "retrying after authorization refresh");
        self.send_recorded(method, descriptor).await
    }

    fn can_refresh_authorization(&self) -> bool {
        self.authenticator.is_some()
    }

    async fn refresh_authorization(&self) -> Result<bool> {
        let Some(authenticator) = self.authenticator.as_deref() else {
            return Ok(false);
        };
        let observed = self.auth_generation.load(Ordering::Acquire);
        self.refresh_since(authenticator, observed).await?;
        Ok(true)
    }
}

/// Render an error with its source chain, e.g. "error sending request: connection refused"
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
