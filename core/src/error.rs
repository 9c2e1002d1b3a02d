//! Error types for the configured client.
//!
//! # Design
//! Only two kinds of failure come from the wire: the request never produced a
//! response (`Network`), or it produced one outside 2xx (`HttpStatus`). Both
//! are surfaced as-is; nothing here retries or translates them. The JSON
//! helpers add two local kinds for payloads that fail to encode or decode.

use std::fmt;

use thiserror::Error;

/// Why a request never produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// DNS, refused connection, TLS, malformed URL, or a broken stream.
    Connect,
    /// The per-request deadline elapsed.
    Timeout,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkErrorKind::Connect => f.write_str("connection failed"),
            NetworkErrorKind::Timeout => f.write_str("timed out"),
        }
    }
}

/// Failure reported by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Errors returned by `ConfiguredClient` and `AccessApi`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received from `url`.
    #[error("network error for {url}: {kind}: {message}")]
    Network {
        url: String,
        kind: NetworkErrorKind,
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A 2xx response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ClientError {
    pub(crate) fn from_transport(url: &str, err: TransportError) -> Self {
        let (kind, message) = match err {
            TransportError::Timeout(msg) => (NetworkErrorKind::Timeout, msg),
            TransportError::Connection(msg) => (NetworkErrorKind::Connect, msg),
        };
        ClientError::Network {
            url: url.to_string(),
            kind,
            message,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ClientError::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            }
        )
    }

    /// Status code of an `HttpStatus` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
