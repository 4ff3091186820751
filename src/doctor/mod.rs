//! `xpost doctor` command implementation.
//!
//! Diagnoses a deployment before it posts anything: credential presence
//! (masked), endpoint reachability, optional asset readability, and an
//! optional live credential round-trip.
//!
//! # Usage
//!
//! ```text
//! # Human-readable output
//! xpost doctor
//!
//! # JSON output
//! xpost doctor --json
//!
//! # Also probe a media file and verify credentials against the live API
//! xpost doctor --asset clip.mp4 --live
//! ```

pub mod types;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio::time::Instant;

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::PostError;
use crate::media::MediaAsset;
use crate::precheck::{self, ConnectivityReport};

use types::{CheckResult, CheckSeverity, CheckStatus, DoctorReport, OverallStatus};

/// Assets above this size cannot go up in a single request; the doctor
/// warns so operators know the chunked path will carry them.
const SIMPLE_UPLOAD_LIMIT: u64 = 5 * 1024 * 1024;

/// Arguments for the `xpost doctor` command.
#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output JSON instead of human-readable format.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Media file to probe for readability and size.
    #[arg(long)]
    pub asset: Option<PathBuf>,

    /// Verify credentials against the live API (makes one network call).
    #[arg(long, default_value_t = false)]
    pub live: bool,

    /// Per-probe timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,
}

/// Run the doctor command.
pub async fn run(args: &DoctorArgs) -> Result<()> {
    let config = Config::from_env_lossy();
    let timeout = Duration::from_secs(args.timeout_secs);

    let mut builder = DoctorReport::builder().credentials(config.credential_report());

    builder = builder.add_check(check_credentials(&config));

    let connectivity = precheck::precheck(
        &[config.api_url.clone(), config.upload_url.clone()],
        timeout,
    )
    .await;
    for check in connectivity_checks(&config, &connectivity) {
        builder = builder.add_check(check);
    }
    builder = builder.connectivity(connectivity);

    if let Some(path) = &args.asset {
        builder = builder.add_check(check_asset(path).await);
    }

    if args.live {
        builder = builder.add_check(check_live(&config, timeout).await);
    }

    let report = builder.build();

    if args.json {
        let output = serde_json::to_string_pretty(&report)?;
        println!("{output}");
    } else {
        print_human_readable(&report);
    }

    // Exit codes: 0 = ok, 1 = fail, 2 = warn
    match report.overall_status {
        OverallStatus::Ok => {}
        OverallStatus::Warn => std::process::exit(2),
        OverallStatus::Fail => std::process::exit(1),
    }

    Ok(())
}

fn check_credentials(config: &Config) -> CheckResult {
    match config.validate_credentials() {
        Ok(()) => {
            let message = if config.bearer_token.is_some() {
                "all required credentials present; bearer token configured"
            } else {
                "all required credentials present; no bearer token (bearer fallback disabled)"
            };
            CheckResult::ok("credentials", message)
        }
        Err(PostError::MissingCredential { keys }) => {
            CheckResult::fail("credentials", format!("not set: {}", keys.join(", ")))
        }
        Err(e) => CheckResult::fail("credentials", e.to_string()),
    }
}

fn connectivity_checks(config: &Config, report: &ConnectivityReport) -> Vec<CheckResult> {
    report
        .endpoints
        .iter()
        .map(|endpoint| {
            let name = if endpoint.endpoint == config.api_url {
                "api_reachable"
            } else {
                "upload_reachable"
            };
            if endpoint.reachable {
                CheckResult::ok(name, format!("{} reachable", endpoint.endpoint))
            } else {
                let detail = endpoint.error.as_deref().unwrap_or("unreachable");
                let check =
                    CheckResult::fail(name, format!("{}: {detail}", endpoint.endpoint));
                if name == "upload_reachable" {
                    // Text-only posting still works without the upload host.
                    check.with_severity(CheckSeverity::Warning)
                } else {
                    check
                }
            }
        })
        .collect()
}

async fn check_asset(path: &std::path::Path) -> CheckResult {
    match MediaAsset::from_path(path).await {
        Ok(asset) if asset.size() > SIMPLE_UPLOAD_LIMIT => CheckResult::warn(
            "asset_readable",
            format!(
                "{}; exceeds the single-request limit, only the chunked path applies",
                asset.describe()
            ),
        ),
        Ok(asset) => CheckResult::ok("asset_readable", asset.describe()),
        Err(e) => CheckResult::fail("asset_readable", e.to_string()),
    }
}

async fn check_live(config: &Config, timeout: Duration) -> CheckResult {
    if config.validate_credentials().is_err() {
        return CheckResult::fail(
            "credential_roundtrip",
            "skipped: credentials incomplete",
        );
    }
    let client = match ApiClient::new(config) {
        Ok(client) => client,
        Err(e) => return CheckResult::fail("credential_roundtrip", e.to_string()),
    };
    let deadline = Some(Instant::now() + timeout);
    match client.verify_credentials(deadline).await {
        Ok(user) => CheckResult::ok(
            "credential_roundtrip",
            format!("authenticated as @{}", user.username),
        ),
        Err(e) => CheckResult::fail("credential_roundtrip", e.to_string()),
    }
}

fn print_human_readable(report: &DoctorReport) {
    let reset = "\x1b[0m";
    let color = report.overall_status.ansi_color();
    let symbol = report.overall_status.symbol();

    println!();
    println!("xpost Doctor Report");
    println!("===================");
    println!();
    println!("Generated:      {}", report.generated_at.to_rfc3339());
    println!(
        "Overall Status: {color}{symbol} {:?}{reset}",
        report.overall_status
    );
    println!();

    println!("Credentials:");
    for cred in &report.credentials {
        let value = match &cred.masked {
            Some(masked) => masked.as_str(),
            None if cred.required => "NOT SET",
            None => "not set (optional)",
        };
        println!("  {:<28} {value}", cred.key);
    }
    println!();

    if let Some(connectivity) = &report.connectivity {
        println!("Connectivity:");
        for endpoint in &connectivity.endpoints {
            let (c, s) = if endpoint.reachable {
                (OverallStatus::Ok.ansi_color(), OverallStatus::Ok.symbol())
            } else {
                (OverallStatus::Fail.ansi_color(), OverallStatus::Fail.symbol())
            };
            let detail = match (&endpoint.error, endpoint.dns_ms) {
                (Some(error), _) => error.clone(),
                (None, Some(ms)) => format!("dns {ms}ms"),
                (None, None) => String::new(),
            };
            println!("  {c}{s}{reset} {:<36} {detail}", endpoint.endpoint);
        }
        println!();
    }

    println!("Checks:");
    for check in &report.checks {
        let status = match check.status {
            CheckStatus::Ok => OverallStatus::Ok,
            CheckStatus::Warn => OverallStatus::Warn,
            CheckStatus::Fail => OverallStatus::Fail,
        };
        println!(
            "  {}{}{reset} {:<22} {}",
            status.ansi_color(),
            status.symbol(),
            check.name,
            check.message
        );
    }
    println!();
}
