//! Pre-configured HTTP client for the access-control backend.
//!
//! # Overview
//! `ConfiguredClient` binds a base URL, a request timeout and a set of
//! default headers to a `Transport`, and exposes the usual request surface
//! (GET/POST/PUT/PATCH/DELETE/HEAD with path, query, body and per-call
//! overrides). `AccessApi` layers typed calls for the backend's routes on
//! top of it.
//!
//! # Design
//! - `ClientConfig` is immutable and validated before a client exists; it is
//!   loaded from code, the environment, or a TOML file.
//! - The client holds no mutable state. Share one instance with `Arc` or
//!   build several from the same config; both behave identically.
//! - Requests resolve to plain-data `HttpRequest` values before the
//!   `Transport` runs them, so resolution is testable without a network.
//! - Failures are `Network` (no response) or `HttpStatus` (non-2xx). There
//!   are no retries.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use api::AccessApi;
pub use client::ConfiguredClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, NetworkErrorKind, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
pub use transport::{Transport, UreqTransport};
pub use types::{
    AccessLog, AccessRequest, AccessResponse, ActionResponse, ApiStatus, AuthCheck, CreateDevice,
    CreateUser, CreateUserResponse, Device, LoginRequest, LoginResponse, UpdateDeviceIp, User,
};
