//! Error taxonomy for the upload and posting pipeline.
//!
//! Precondition failures (`MissingCredential`, `MalformedCredential`,
//! `LocalAssetUnreadable`) abort before any network call and are never
//! aggregated with network attempts. Network-layer failures are recorded per
//! attempt and only surface to the caller once every strategy has been tried.

use std::time::Duration;

use thiserror::Error;

use crate::report::{AggregateFailure, ErrorKind, UploadAttempt};

/// Result type for upload and posting operations.
pub type PostResult<T> = Result<T, PostError>;

/// Errors from the upload chain and post-creation client.
#[derive(Error, Debug)]
pub enum PostError {
    /// One or more required credentials are absent.
    #[error("missing credential(s): {}", keys.join(", "))]
    MissingCredential { keys: Vec<String> },

    /// A credential is present but fails the basic shape check.
    #[error("malformed credential {key}: {reason}")]
    MalformedCredential { key: String, reason: String },

    /// DNS resolution, TCP connect, or TLS handshake failed.
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// The asset is larger than the strategy supports; no request was sent.
    #[error("{strategy}: asset of {size} bytes exceeds the {limit} byte limit")]
    SizeUnsupported {
        strategy: &'static str,
        size: u64,
        limit: u64,
    },

    /// The remote API rejected the request with a non-retryable status.
    #[error("remote rejected request (HTTP {status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// Timeout, dropped connection, or retryable remote status (408/429/5xx).
    #[error("transient network failure: {message}")]
    TransientNetwork {
        message: String,
        status: Option<u16>,
        retry_after: Option<Duration>,
    },

    /// The caller's deadline expired before the chain could finish.
    #[error("deadline exceeded after {} recorded attempt(s)", attempts.len())]
    Deadline { attempts: Vec<UploadAttempt> },

    /// Local asset missing, unreadable, or its size changed under us.
    #[error("local asset unreadable ({path}): {reason}")]
    LocalAssetUnreadable { path: String, reason: String },

    /// Every configured strategy failed.
    #[error("{0}")]
    AllStrategiesExhausted(AggregateFailure),

    /// Transport-level failure not classified as connectivity or timeout.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// OAuth signature generation failed.
    #[error("OAuth error: {0}")]
    OAuth(String),
}

impl PostError {
    /// Map this error into the fixed reporting taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential { .. } => ErrorKind::MissingCredential,
            Self::MalformedCredential { .. } | Self::OAuth(_) => ErrorKind::MalformedCredential,
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::SizeUnsupported { .. } => ErrorKind::SizeUnsupported,
            Self::RemoteRejected { .. } | Self::Json(_) => ErrorKind::RemoteRejected,
            Self::TransientNetwork { .. } => ErrorKind::TransientNetwork,
            Self::Deadline { .. } => ErrorKind::Deadline,
            Self::LocalAssetUnreadable { .. } => ErrorKind::LocalAssetUnreadable,
            Self::AllStrategiesExhausted(_) => ErrorKind::AllStrategiesExhausted,
            Self::Http(e) => {
                if e.is_timeout() {
                    ErrorKind::TransientNetwork
                } else if e.is_connect() {
                    ErrorKind::Connectivity
                } else {
                    ErrorKind::TransientNetwork
                }
            }
        }
    }

    /// Whether an in-strategy retry may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransientNetwork)
    }

    /// Remote-suggested delay before the next try, when one was given.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TransientNetwork { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status associated with this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteRejected { status, .. } => Some(*status),
            Self::TransientNetwork { status, .. } => *status,
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PostError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::TransientNetwork {
                message: e.to_string(),
                status: None,
                retry_after: None,
            }
        } else if e.is_connect() {
            Self::Connectivity(e.to_string())
        } else {
            Self::Http(e)
        }
    }
}
