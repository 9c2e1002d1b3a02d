//! The network seam behind `ConfiguredClient`.
//!
//! # Design
//! `Transport` takes a fully resolved `HttpRequest` and returns whatever the
//! server answered, status included. Deciding what counts as an error is the
//! client's job, so implementations must hand back 4xx/5xx responses as data.
//! `UreqTransport` is the production implementation; tests substitute their
//! own.

use tracing::trace;
use ureq::{Agent, RequestBuilder};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip. One attempt, no retries.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// `Transport` backed by a pooled `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    fn send(&self, request: &HttpRequest) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let url = request.url.as_str();
        let body = request.body.as_deref();
        match request.method {
            HttpMethod::Get => send_without_body(prepare(self.agent.get(url), request), body),
            HttpMethod::Delete => send_without_body(prepare(self.agent.delete(url), request), body),
            HttpMethod::Head => send_without_body(prepare(self.agent.head(url), request), body),
            HttpMethod::Post => send_with_body(prepare(self.agent.post(url), request), body),
            HttpMethod::Put => send_with_body(prepare(self.agent.put(url), request), body),
            HttpMethod::Patch => send_with_body(prepare(self.agent.patch(url), request), body),
        }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut response = self.send(request).map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = if request.method == HttpMethod::Head {
            String::new()
        } else {
            response.body_mut().read_to_string().map_err(map_error)?
        };

        trace!(method = %request.method, url = %request.url, status, "transport round-trip complete");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Apply query, headers and the per-request deadline.
fn prepare<B>(builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    let builder = request
        .query
        .iter()
        .fold(builder, |b, (key, value)| b.query(key, value));
    let builder = request
        .headers
        .iter()
        .fold(builder, |b, (name, value)| b.header(name.as_str(), value.as_str()));
    builder
        .config()
        .timeout_global(Some(request.timeout))
        .build()
}

fn send_without_body(
    builder: RequestBuilder<ureq::typestate::WithoutBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.force_send_body().send(body),
        None => builder.call(),
    }
}

fn send_with_body(
    builder: RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body),
        None => builder.send_empty(),
    }
}

fn map_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout(err.to_string()),
        ureq::Error::Io(ref io) if io.kind() == std::io::ErrorKind::TimedOut => {
            TransportError::Timeout(err.to_string())
        }
        other => TransportError::Connection(other.to_string()),
    }
}
