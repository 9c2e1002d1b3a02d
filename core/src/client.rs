//! Pre-configured HTTP client bound to one backend.
//!
//! # Design
//! `ConfiguredClient` owns an immutable `ClientConfig` and a `Transport`. It
//! carries no other state, so a single instance can be shared across threads
//! (wrap it in `Arc`) and two instances built from equal configs behave the
//! same. Every call is resolved into an `HttpRequest` first (`build_request`)
//! and then executed once; there is no retry and no fallback.
//!
//! Resolution rules:
//! - URL is `base_url + path`, concatenated verbatim.
//! - Timeout is the per-call override, else the configured timeout.
//! - Headers are the defaults merged with per-call headers; a per-call header
//!   replaces any default with the same name (ASCII case-insensitive).

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ConfigError};
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
use crate::transport::{Transport, UreqTransport};

/// HTTP client with a fixed base URL, timeout and default headers.
#[derive(Debug, Clone)]
pub struct ConfiguredClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl ConfiguredClient<UreqTransport> {
    /// Build a client over a fresh `ureq` agent.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> ConfiguredClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve `path` and `options` against the configuration without sending.
    pub fn build_request(&self, method: HttpMethod, path: &str, options: RequestOptions) -> HttpRequest {
        let mut headers: Vec<(String, String)> = self
            .config
            .default_headers()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, value) in options.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }

        HttpRequest {
            method,
            url: format!("{}{}", self.config.base_url(), path),
            query: options.query,
            headers,
            body: options.body,
            timeout: options.timeout.unwrap_or_else(|| self.config.timeout()),
        }
    }

    /// Send one request. Non-2xx responses become `ClientError::HttpStatus`.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, ClientError> {
        let request = self.build_request(method, path, options);
        let started = Instant::now();

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!(method = %request.method, url = %request.url, error = %err, "request failed");
                return Err(ClientError::from_transport(&request.url, err));
            }
        };

        debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request complete"
        );

        if !response.is_success() {
            return Err(ClientError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    pub fn get(&self, path: &str, options: RequestOptions) -> Result<HttpResponse, ClientError> {
        self.request(HttpMethod::Get, path, options)
    }

    pub fn post(&self, path: &str, options: RequestOptions) -> Result<HttpResponse, ClientError> {
        self.request(HttpMethod::Post, path, options)
    }

    pub fn put(&self, path: &str, options: RequestOptions) -> Result<HttpResponse, ClientError> {
        self.request(HttpMethod::Put, path, options)
    }

    pub fn patch(&self, path: &str, options: RequestOptions) -> Result<HttpResponse, ClientError> {
        self.request(HttpMethod::Patch, path, options)
    }

    pub fn delete(&self, path: &str, options: RequestOptions) -> Result<HttpResponse, ClientError> {
        self.request(HttpMethod::Delete, path, options)
    }

    pub fn head(&self, path: &str, options: RequestOptions) -> Result<HttpResponse, ClientError> {
        self.request(HttpMethod::Head, path, options)
    }

    pub fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        self.request_json(HttpMethod::Get, path, RequestOptions::new())
    }

    pub fn post_json<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, ClientError> {
        self.request_json(HttpMethod::Post, path, json_body(body)?)
    }

    pub fn put_json<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, ClientError> {
        self.request_json(HttpMethod::Put, path, json_body(body)?)
    }

    pub fn delete_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        self.request_json(HttpMethod::Delete, path, RequestOptions::new())
    }

    /// Send a request and decode a 2xx body as JSON.
    pub fn request_json<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, ClientError> {
        let response = self.request(method, path, options)?;
        serde_json::from_str(&response.body).map_err(|e| ClientError::Deserialization(e.to_string()))
    }
}

fn json_body<B: Serialize>(body: &B) -> Result<RequestOptions, ClientError> {
    let body = serde_json::to_string(body).map_err(|e| ClientError::Serialization(e.to_string()))?;
    Ok(RequestOptions::new().body(body))
}
