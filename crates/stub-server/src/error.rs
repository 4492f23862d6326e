//! Error types surfaced by the stub engine.

use thiserror::Error;

/// Failures delivered to the host through `ResponseSink::on_error`.
///
/// None of these are returned across the registration or handler API; the
/// emitter routes them to the error event instead.
#[derive(Debug, Error)]
pub enum StubError {
    #[error("Failed to encode JSON body: {0}")]
    BodyEncode(#[from] serde_json::Error),
    #[error("Failed to prepare response: {0}")]
    ResponseConstruction(String),
    #[error("Handler error: {0}")]
    Handler(#[from] anyhow::Error),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl StubError {
    /// Build a handler error from a plain message.
    pub fn handler(message: impl Into<String>) -> Self {
        StubError::Handler(anyhow::anyhow!(message.into()))
    }
}

/// No active stub accepts the request.
///
/// This is a sentinel, not a failure: the interception layer falls through
/// to real network handling when it sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No stub matched the request")]
pub struct NoStubMatched;

/// Errors raised while loading a stub file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read stub file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse stub file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),
    #[error("Invalid method '{method}' in stub #{index}")]
    InvalidMethod { index: usize, method: String },
    #[error("Invalid status code {status} in stub #{index}")]
    InvalidStatus { index: usize, status: u16 },
}
