//! Doctor report types for machine-readable JSON output.
//!
//! These types define the stable JSON schema for deployment self-check
//! reports, enabling automation and operator tooling integration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CredentialStatus;
use crate::precheck::ConnectivityReport;

/// Complete doctor report: credential state, connectivity, and checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReport {
    /// Schema version for forward/backward compatibility.
    pub schema_version: String,

    /// Timestamp when the report was generated.
    pub generated_at: DateTime<Utc>,

    /// Overall status summary.
    pub overall_status: OverallStatus,

    /// Per-credential presence, with values masked to the last four
    /// characters.
    pub credentials: Vec<CredentialStatus>,

    /// Endpoint reachability probes, when connectivity was checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<ConnectivityReport>,

    /// Individual check results.
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    /// Schema version constant.
    pub const SCHEMA_VERSION: &'static str = "1.0.0";

    /// Create a new doctor report builder.
    #[must_use]
    pub fn builder() -> DoctorReportBuilder {
        DoctorReportBuilder::new()
    }
}

/// Builder for DoctorReport.
pub struct DoctorReportBuilder {
    credentials: Vec<CredentialStatus>,
    connectivity: Option<ConnectivityReport>,
    checks: Vec<CheckResult>,
}

impl DoctorReportBuilder {
    fn new() -> Self {
        Self {
            credentials: Vec::new(),
            connectivity: None,
            checks: Vec::new(),
        }
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Vec<CredentialStatus>) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn connectivity(mut self, report: ConnectivityReport) -> Self {
        self.connectivity = Some(report);
        self
    }

    #[must_use]
    pub fn add_check(mut self, check: CheckResult) -> Self {
        self.checks.push(check);
        self
    }

    #[must_use]
    pub fn build(self) -> DoctorReport {
        let overall_status = compute_overall_status(&self.checks);

        DoctorReport {
            schema_version: DoctorReport::SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            overall_status,
            credentials: self.credentials,
            connectivity: self.connectivity,
            checks: self.checks,
        }
    }
}

fn compute_overall_status(checks: &[CheckResult]) -> OverallStatus {
    // FAIL if any critical check failed
    if checks
        .iter()
        .any(|c| c.status == CheckStatus::Fail && c.severity == CheckSeverity::Critical)
    {
        return OverallStatus::Fail;
    }

    // WARN on any non-passing check
    if checks
        .iter()
        .any(|c| c.status == CheckStatus::Warn || c.status == CheckStatus::Fail)
    {
        return OverallStatus::Warn;
    }

    OverallStatus::Ok
}

/// Overall status of the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    /// All checks pass; posting should work.
    Ok,
    /// Warnings present but posting may still proceed.
    Warn,
    /// Critical failures; posting will not work.
    Fail,
}

impl OverallStatus {
    /// Get ANSI color code for terminal output.
    #[must_use]
    pub const fn ansi_color(&self) -> &'static str {
        match self {
            Self::Ok => "\x1b[32m",   // Green
            Self::Warn => "\x1b[33m", // Yellow
            Self::Fail => "\x1b[31m", // Red
        }
    }

    /// Get symbol for terminal output.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Warn => "⚠",
            Self::Fail => "✗",
        }
    }
}

/// Individual check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check name.
    pub name: String,

    /// Check status.
    pub status: CheckStatus,

    /// Check severity.
    pub severity: CheckSeverity,

    /// Human-readable message.
    pub message: String,
}

impl CheckResult {
    /// Create a passing check.
    #[must_use]
    pub fn ok(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Ok,
            severity: CheckSeverity::Info,
            message: message.into(),
        }
    }

    /// Create a warning check.
    #[must_use]
    pub fn warn(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warn,
            severity: CheckSeverity::Warning,
            message: message.into(),
        }
    }

    /// Create a failing check.
    #[must_use]
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Fail,
            severity: CheckSeverity::Critical,
            message: message.into(),
        }
    }

    /// Set severity level.
    #[must_use]
    pub const fn with_severity(mut self, severity: CheckSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Check status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

/// Check severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckSeverity {
    Info,
    Warning,
    Critical,
}
