//! Structured upload attempt records and the aggregate diagnostic report.
//!
//! Every strategy invocation produces one [`UploadAttempt`] with a classified
//! outcome. When every strategy has failed, the orchestrator hands the caller
//! an [`AggregateFailure`] carrying the full attempt list in priority order,
//! so an operator can diagnose the run without re-running with extra
//! instrumentation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classified failure category for a single attempt or a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required credential is absent.
    MissingCredential,
    /// A credential is present but fails the basic shape check.
    MalformedCredential,
    /// DNS, TCP, or TLS layer failure before any HTTP exchange.
    Connectivity,
    /// Asset exceeds the strategy's declared size limit; skipped pre-flight.
    SizeUnsupported,
    /// The remote API answered with a non-retryable 4xx.
    RemoteRejected,
    /// Timeout, dropped connection, 408/429/5xx. Retried locally first.
    TransientNetwork,
    /// The caller's deadline expired before the chain could finish.
    Deadline,
    /// Local asset missing, unreadable, or its size changed under us.
    LocalAssetUnreadable,
    /// Every configured strategy failed; the aggregate report has details.
    AllStrategiesExhausted,
}

impl ErrorKind {
    /// Stable lowercase label used in reports and log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::Connectivity => "connectivity",
            Self::SizeUnsupported => "size_unsupported",
            Self::RemoteRejected => "remote_rejected",
            Self::TransientNetwork => "transient_network",
            Self::Deadline => "deadline",
            Self::LocalAssetUnreadable => "local_asset_unreadable",
            Self::AllStrategiesExhausted => "all_strategies_exhausted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one strategy invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The strategy produced a usable media handle.
    Succeeded { media_id: String },

    /// The strategy ran and failed with a classified error.
    Failed {
        kind: ErrorKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        message: String,
    },

    /// The strategy was skipped without any network I/O.
    Skipped { kind: ErrorKind, message: String },
}

/// Record of one try of one strategy. Immutable once completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadAttempt {
    /// Strategy name (e.g. `chunked`, `simple_oauth1`).
    pub strategy: String,

    /// When the attempt started.
    pub started_at: DateTime<Utc>,

    /// When the attempt completed (or was skipped).
    pub finished_at: DateTime<Utc>,

    /// Classified outcome.
    pub outcome: AttemptOutcome,

    /// Bytes handed to the transport. Zero for skipped or failed attempts
    /// where the transferred amount is unknown.
    pub bytes_sent: u64,

    /// In-strategy transient retries consumed before this outcome.
    pub retries: u32,
}

impl UploadAttempt {
    /// Start recording an attempt for the named strategy.
    #[must_use]
    pub fn begin(strategy: &str) -> PendingAttempt {
        PendingAttempt {
            strategy: strategy.to_string(),
            started_at: Utc::now(),
        }
    }

    /// Whether this attempt produced a media handle.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded { .. })
    }

    /// Wall-clock time the attempt took, in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// An attempt whose outcome is not yet known.
#[derive(Debug)]
pub struct PendingAttempt {
    strategy: String,
    started_at: DateTime<Utc>,
}

impl PendingAttempt {
    /// Complete the attempt with a media handle.
    #[must_use]
    pub fn succeed(self, media_id: impl Into<String>, bytes_sent: u64, retries: u32) -> UploadAttempt {
        self.finish(
            AttemptOutcome::Succeeded {
                media_id: media_id.into(),
            },
            bytes_sent,
            retries,
        )
    }

    /// Complete the attempt with a classified failure.
    #[must_use]
    pub fn fail(
        self,
        kind: ErrorKind,
        status: Option<u16>,
        message: impl Into<String>,
        retries: u32,
    ) -> UploadAttempt {
        self.finish(
            AttemptOutcome::Failed {
                kind,
                status,
                message: message.into(),
            },
            0,
            retries,
        )
    }

    /// Complete the attempt as skipped, before any network I/O.
    #[must_use]
    pub fn skip(self, kind: ErrorKind, message: impl Into<String>) -> UploadAttempt {
        self.finish(
            AttemptOutcome::Skipped {
                kind,
                message: message.into(),
            },
            0,
            0,
        )
    }

    fn finish(self, outcome: AttemptOutcome, bytes_sent: u64, retries: u32) -> UploadAttempt {
        UploadAttempt {
            strategy: self.strategy,
            started_at: self.started_at,
            finished_at: Utc::now(),
            outcome,
            bytes_sent,
            retries,
        }
    }
}

/// Combined report of all attempts when every strategy in the chain failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateFailure {
    /// All attempts, in strategy-priority order.
    pub attempts: Vec<UploadAttempt>,
}

impl AggregateFailure {
    #[must_use]
    pub fn new(attempts: Vec<UploadAttempt>) -> Self {
        Self { attempts }
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "all {} upload strategies failed",
            self.attempts.len()
        )?;
        for (i, attempt) in self.attempts.iter().enumerate() {
            let (label, status, message) = match &attempt.outcome {
                AttemptOutcome::Succeeded { media_id } => {
                    ("succeeded", None, media_id.clone())
                }
                AttemptOutcome::Failed {
                    kind,
                    status,
                    message,
                } => (kind.as_str(), *status, message.clone()),
                AttemptOutcome::Skipped { kind, message } => {
                    (kind.as_str(), None, message.clone())
                }
            };
            write!(
                f,
                "\n  {}. {}: {}{} after {}ms ({} retries): {}",
                i + 1,
                attempt.strategy,
                label,
                status.map_or_else(String::new, |s| format!(" (HTTP {s})")),
                attempt.elapsed_ms(),
                attempt.retries,
                message
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_lifecycle_records_outcome() {
        let attempt = UploadAttempt::begin("chunked").succeed("12345", 1024, 1);
        assert!(attempt.succeeded());
        assert_eq!(attempt.strategy, "chunked");
        assert_eq!(attempt.bytes_sent, 1024);
        assert_eq!(attempt.retries, 1);
        assert!(attempt.elapsed_ms() >= 0);
    }

    #[test]
    fn aggregate_display_lists_every_attempt_in_order() {
        let attempts = vec![
            UploadAttempt::begin("chunked").fail(
                ErrorKind::RemoteRejected,
                Some(413),
                "Payload Too Large",
                0,
            ),
            UploadAttempt::begin("simple_oauth1").skip(
                ErrorKind::SizeUnsupported,
                "50000000 bytes exceeds 5242880 byte limit",
            ),
        ];
        let report = AggregateFailure::new(attempts);
        let rendered = report.to_string();

        assert!(rendered.starts_with("all 2 upload strategies failed"));
        let chunked_pos = rendered.find("1. chunked").unwrap();
        let simple_pos = rendered.find("2. simple_oauth1").unwrap();
        assert!(chunked_pos < simple_pos);
        assert!(rendered.contains("HTTP 413"));
        assert!(rendered.contains("size_unsupported"));
    }

    #[test]
    fn attempt_serializes_with_tagged_outcome() {
        let attempt = UploadAttempt::begin("simple_bearer").fail(
            ErrorKind::TransientNetwork,
            Some(503),
            "Service Unavailable",
            2,
        );
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["outcome"]["result"], "failed");
        assert_eq!(json["outcome"]["kind"], "transient_network");
        assert_eq!(json["outcome"]["status"], 503);
        assert_eq!(json["retries"], 2);
    }
}
