//! Error types for the debate engine
//!
//! `ProviderError` is what a model call produces once retries are exhausted.
//! `RoundFailure` is what a round produces when too many agents failed; the
//! controller turns both into data on the outcome. `DebateError` covers setup
//! and I/O failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Turn;

/// Category of a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The call did not complete within the configured timeout
    Timeout,
    /// The provider throttled the request (HTTP 429)
    RateLimited,
    /// The provider answered, but the answer was unusable
    InvalidResponse,
    /// Connection or server-side failure (connect errors, 5xx)
    Transport,
    /// The request was rejected before being sent (e.g. empty prompt)
    InvalidRequest,
}

impl ProviderErrorKind {
    /// Whether a call failing with this kind is worth retrying
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ProviderErrorKind::Timeout | ProviderErrorKind::RateLimited | ProviderErrorKind::Transport
        )
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::RateLimited => write!(f, "rate_limited"),
            ProviderErrorKind::InvalidResponse => write!(f, "invalid_response"),
            ProviderErrorKind::Transport => write!(f, "transport"),
            ProviderErrorKind::InvalidRequest => write!(f, "invalid_request"),
        }
    }
}

/// Error surfaced by a model provider call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidResponse, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message)
    }

    /// Classify an HTTP status that was not a success
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body);
        if status.as_u16() == 429 {
            Self::rate_limited(message)
        } else if status.is_server_error() {
            Self::transport(message)
        } else {
            Self::invalid_response(message)
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::transport(err.to_string())
        } else if err.is_decode() {
            Self::invalid_response(err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}

/// Too many agents failed within a single round
#[derive(Error, Debug, Clone)]
#[error("round {round} failed: {failed}/{total} agents failed")]
pub struct RoundFailure {
    /// 1-based round number
    pub round: usize,
    /// Number of failed agents
    pub failed: usize,
    /// Number of agents in the round
    pub total: usize,
    /// Slot-ordered turns of the round, failed slots included
    pub turns: Vec<Turn>,
}

/// Main error type for debate operations
#[derive(Error, Debug)]
pub enum DebateError {
    /// Configuration errors (fatal at INIT)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for debate operations
pub type Result<T> = std::result::Result<T, DebateError>;

impl DebateError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
