//! Connectivity prechecker.
//!
//! Probes each remote endpoint in stages (DNS resolution, TCP connect, then
//! a TLS handshake via a bounded HTTPS request) without uploading any data.
//! Soft-fails: every outcome lands in the report and nothing is raised, so a
//! diagnostic caller can decide whether to proceed. Reports are produced
//! fresh on every check and never persisted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpStream, lookup_host};
use tracing::debug;

/// Per-endpoint probe result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointReport {
    /// The probed URL.
    pub endpoint: String,

    /// Host name the probe resolved.
    pub host: String,

    /// Whether DNS resolution produced at least one address.
    pub dns_resolved: bool,

    /// DNS resolution time in milliseconds, when resolution completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_ms: Option<u64>,

    /// Whether a TCP connection was established.
    pub tcp_connected: bool,

    /// Whether the TLS handshake (and HTTP exchange) completed.
    pub tls_ok: bool,

    /// Overall verdict: every applicable stage passed.
    pub reachable: bool,

    /// First failing stage, as `stage: detail`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one precheck run over a set of endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityReport {
    /// When the probes ran.
    pub generated_at: DateTime<Utc>,

    /// One report per probed endpoint, in input order.
    pub endpoints: Vec<EndpointReport>,
}

impl ConnectivityReport {
    /// Whether every probed endpoint was reachable.
    #[must_use]
    pub fn all_reachable(&self) -> bool {
        self.endpoints.iter().all(|e| e.reachable)
    }
}

/// Probe the given endpoint URLs with a bounded per-stage timeout.
pub async fn precheck(endpoints: &[String], timeout: Duration) -> ConnectivityReport {
    let mut reports = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        reports.push(probe_endpoint(endpoint, timeout).await);
    }
    ConnectivityReport {
        generated_at: Utc::now(),
        endpoints: reports,
    }
}

async fn probe_endpoint(endpoint: &str, timeout: Duration) -> EndpointReport {
    let mut report = EndpointReport {
        endpoint: endpoint.to_string(),
        host: String::new(),
        dns_resolved: false,
        dns_ms: None,
        tcp_connected: false,
        tls_ok: false,
        reachable: false,
        error: None,
    };

    let url = match reqwest::Url::parse(endpoint) {
        Ok(url) => url,
        Err(e) => {
            report.error = Some(format!("url: {e}"));
            return report;
        }
    };
    let Some(host) = url.host_str().map(str::to_string) else {
        report.error = Some("url: missing host".into());
        return report;
    };
    let port = url.port_or_known_default().unwrap_or(443);
    let uses_tls = url.scheme() == "https";
    report.host.clone_from(&host);

    // Stage 1: DNS.
    let dns_started = std::time::Instant::now();
    let addr = match tokio::time::timeout(timeout, lookup_host((host.as_str(), port))).await {
        Ok(Ok(mut addrs)) => match addrs.next() {
            Some(addr) => {
                report.dns_resolved = true;
                report.dns_ms = Some(dns_started.elapsed().as_millis() as u64);
                addr
            }
            None => {
                report.error = Some("dns: no addresses resolved".into());
                return report;
            }
        },
        Ok(Err(e)) => {
            report.error = Some(format!("dns: {e}"));
            return report;
        }
        Err(_) => {
            report.error = Some("dns: resolution timed out".into());
            return report;
        }
    };
    debug!(endpoint, %addr, dns_ms = ?report.dns_ms, "resolved endpoint");

    // Stage 2: TCP connect.
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => report.tcp_connected = true,
        Ok(Err(e)) => {
            report.error = Some(format!("tcp: {e}"));
            return report;
        }
        Err(_) => {
            report.error = Some("tcp: connect timed out".into());
            return report;
        }
    }

    // Stage 3: TLS handshake, established through a bounded request. Any
    // HTTP status counts as reachable; the probe asserts the path to the
    // server, not API health.
    if uses_tls {
        let probe = async {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            client.head(url.clone()).send().await.map(|_| ())
        };
        match probe.await {
            Ok(()) => report.tls_ok = true,
            Err(e) => {
                report.error = Some(format!("tls: {e}"));
                return report;
            }
        }
    }

    report.reachable = report.dns_resolved && report.tcp_connected && (!uses_tls || report.tls_ok);
    report
}
