//! Moodle web service client: the function invoker.
//!
//! # Design
//! `MoodleClient` owns a [`Transport`] and the current [`ServiceEndpoint`].
//! A call builds an `HttpRequest` from the endpoint, runs it through the
//! transport under the caller's [`CallContext`], and hands the response to
//! the classifier. Resource modules (`course`, `quiz`, `grade`, `site`,
//! `user`, `auth`) add thin typed methods on top of [`MoodleClient::call`].
//!
//! The endpoint sits behind a lock as an `Arc`. Readers clone the `Arc` and
//! work from that snapshot; a login swaps in a whole new endpoint.

use std::sync::{Arc, PoisonError, RwLock};

use url::Url;

use crate::classify::{self, Envelope};
use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::convert::IntoDomain;
use crate::endpoint::ServiceEndpoint;
use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse};
use crate::query::QueryParams;
use crate::transport::{ReqwestTransport, Transport};

pub struct MoodleClient<T = ReqwestTransport> {
    transport: T,
    endpoint: RwLock<Arc<ServiceEndpoint>>,
}

impl MoodleClient<ReqwestTransport> {
    /// Client over `reqwest` using the configured URL, token and timeout.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(
            ServiceEndpoint::new(config.service_url, config.token),
            transport,
        ))
    }

    /// Build a client and replace its token with one obtained by logging in.
    pub async fn connect_with_login(
        config: ClientConfig,
        ctx: &CallContext,
        username: &str,
        password: &str,
    ) -> Result<Self, Error> {
        let client = Self::new(config)?;
        client.login(ctx, username, password).await?;
        Ok(client)
    }
}

impl<T: Transport> MoodleClient<T> {
    pub fn with_transport(endpoint: ServiceEndpoint, transport: T) -> Self {
        Self {
            transport,
            endpoint: RwLock::new(Arc::new(endpoint)),
        }
    }

    /// Snapshot of the current endpoint.
    pub fn endpoint(&self) -> Arc<ServiceEndpoint> {
        self.endpoint
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn service_url(&self) -> Url {
        self.endpoint().service_url().clone()
    }

    /// Replace the session token. Calls already in flight keep the old one.
    pub fn set_token(&self, token: impl Into<String>) {
        let mut guard = self.endpoint.write().unwrap_or_else(PoisonError::into_inner);
        let next = guard.with_token(token);
        *guard = Arc::new(next);
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Invoke `function` with `params` and decode the response into `E`.
    pub async fn call<E: Envelope>(
        &self,
        ctx: &CallContext,
        function: &str,
        params: &QueryParams,
    ) -> Result<E, Error> {
        let request = self.endpoint().build_call(function, params);
        tracing::debug!(function, host = request.url.host_str(), "calling service function");
        self.fetch(ctx, request, function).await
    }

    /// [`MoodleClient::call`] followed by the envelope's domain mapping.
    pub async fn call_mapped<E>(
        &self,
        ctx: &CallContext,
        function: &str,
        params: &QueryParams,
    ) -> Result<E::Domain, Error>
    where
        E: Envelope + IntoDomain,
    {
        let envelope: E = self.call(ctx, function, params).await?;
        Ok(envelope.into_domain()?)
    }

    pub(crate) async fn fetch<E: Envelope>(
        &self,
        ctx: &CallContext,
        request: HttpRequest,
        label: &str,
    ) -> Result<E, Error> {
        let response = execute(&self.transport, ctx, request).await?;
        tracing::debug!(
            function = label,
            status = response.status,
            bytes = response.body.len(),
            "received response"
        );
        tracing::trace!(
            function = label,
            body = %String::from_utf8_lossy(&response.body),
            "response body"
        );
        classify::parse(response).inspect_err(|e| match e {
            Error::Application(app) => {
                tracing::warn!(function = label, code = %app.error_code, "service reported an error")
            }
            Error::Warnings(w) => {
                tracing::warn!(function = label, count = w.len(), "service returned warnings")
            }
            _ => {}
        })
    }
}

/// Run `request` on `transport`, giving up as soon as `ctx` is cancelled or
/// its deadline passes. Dropping the transport future aborts the request.
pub(crate) async fn execute<T: Transport>(
    transport: &T,
    ctx: &CallContext,
    request: HttpRequest,
) -> Result<HttpResponse, Error> {
    if ctx.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let round_trip = transport.execute(request);
    let result = match ctx.deadline() {
        Some(deadline) => tokio::select! {
            biased;
            _ = ctx.token().cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep_until(deadline) => return Err(Error::DeadlineExceeded),
            result = round_trip => result,
        },
        None => tokio::select! {
            biased;
            _ = ctx.token().cancelled() => return Err(Error::Cancelled),
            result = round_trip => result,
        },
    };
    Ok(result?)
}
