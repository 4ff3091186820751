//! Client configuration and credential validation.
//!
//! Configuration is loaded once at process start (from the environment or
//! deserialized from a file by the embedding application) and treated as
//! immutable thereafter. The credential validator is offline: it checks
//! presence and shape only and never contacts the network or logs a value.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PostError, PostResult};

/// Environment variables holding the required OAuth 1.0a credentials.
pub const REQUIRED_CREDENTIAL_KEYS: [&str; 4] = [
    "TWITTER_API_KEY",
    "TWITTER_API_SECRET",
    "TWITTER_ACCESS_TOKEN",
    "TWITTER_ACCESS_TOKEN_SECRET",
];

/// Environment variable holding the optional app-only bearer token.
pub const BEARER_CREDENTIAL_KEY: &str = "TWITTER_BEARER_TOKEN";

/// Configuration for the posting client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OAuth 1.0a Consumer Key (API Key)
    pub consumer_key: String,

    /// OAuth 1.0a Consumer Secret (API Secret)
    pub consumer_secret: String,

    /// OAuth 1.0a Access Token
    pub access_token: String,

    /// OAuth 1.0a Access Token Secret
    pub access_token_secret: String,

    /// OAuth 2.0 Bearer Token (enables the bearer fallback strategy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    /// Base URL for the API v2 (default: https://api.twitter.com)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL for media upload (default: https://upload.twitter.com)
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Chunk size for segmented uploads, in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// In-strategy retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_api_url() -> String {
    "https://api.twitter.com".into()
}

fn default_upload_url() -> String {
    "https://upload.twitter.com".into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_chunk_size() -> usize {
    1024 * 1024
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Bounded in-strategy retry configuration. The bound is fixed, not
/// adaptive, so total chain latency stays predictable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum tries per strategy (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            access_token: String::new(),
            access_token_secret: String::new(),
            bearer_token: None,
            api_url: default_api_url(),
            upload_url: default_upload_url(),
            timeout: default_timeout(),
            chunk_size: default_chunk_size(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Reads the four required `TWITTER_*` credential variables, the optional
    /// bearer token, and the `XPOST_API_URL` / `XPOST_UPLOAD_URL` endpoint
    /// overrides. Fails with `MissingCredential` naming every absent key.
    pub fn from_env() -> PostResult<Self> {
        let config = Self::from_env_lossy();
        config.validate_credentials()?;
        Ok(config)
    }

    /// Load whatever the environment has without validating. The self-check
    /// tool uses this so a broken deployment still yields a full report
    /// instead of an early error.
    #[must_use]
    pub fn from_env_lossy() -> Self {
        let var = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_default()
        };

        Self {
            consumer_key: var(REQUIRED_CREDENTIAL_KEYS[0]),
            consumer_secret: var(REQUIRED_CREDENTIAL_KEYS[1]),
            access_token: var(REQUIRED_CREDENTIAL_KEYS[2]),
            access_token_secret: var(REQUIRED_CREDENTIAL_KEYS[3]),
            bearer_token: std::env::var(BEARER_CREDENTIAL_KEY)
                .ok()
                .filter(|v| !v.trim().is_empty()),
            api_url: std::env::var("XPOST_API_URL").unwrap_or_else(|_| default_api_url()),
            upload_url: std::env::var("XPOST_UPLOAD_URL").unwrap_or_else(|_| default_upload_url()),
            ..Self::default()
        }
    }

    /// Validate credential presence and shape. Offline; never logs values.
    ///
    /// Returns `MissingCredential` listing every empty required key, or
    /// `MalformedCredential` for the first value containing embedded
    /// whitespace or control characters.
    pub fn validate_credentials(&self) -> PostResult<()> {
        let required = [
            (REQUIRED_CREDENTIAL_KEYS[0], &self.consumer_key),
            (REQUIRED_CREDENTIAL_KEYS[1], &self.consumer_secret),
            (REQUIRED_CREDENTIAL_KEYS[2], &self.access_token),
            (REQUIRED_CREDENTIAL_KEYS[3], &self.access_token_secret),
        ];

        let missing: Vec<String> = required
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| (*k).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PostError::MissingCredential { keys: missing });
        }

        for (key, value) in required {
            check_shape(key, value)?;
        }
        if let Some(bearer) = &self.bearer_token {
            check_shape(BEARER_CREDENTIAL_KEY, bearer)?;
        }

        Ok(())
    }

    /// Per-credential presence report for the self-check tool. Values are
    /// masked down to their last four characters.
    #[must_use]
    pub fn credential_report(&self) -> Vec<CredentialStatus> {
        let mut report: Vec<CredentialStatus> = [
            (REQUIRED_CREDENTIAL_KEYS[0], self.consumer_key.as_str(), true),
            (REQUIRED_CREDENTIAL_KEYS[1], self.consumer_secret.as_str(), true),
            (REQUIRED_CREDENTIAL_KEYS[2], self.access_token.as_str(), true),
            (
                REQUIRED_CREDENTIAL_KEYS[3],
                self.access_token_secret.as_str(),
                true,
            ),
        ]
        .into_iter()
        .map(|(key, value, required)| CredentialStatus {
            key: key.to_string(),
            required,
            present: !value.is_empty(),
            masked: (!value.is_empty()).then(|| mask_secret(value)),
        })
        .collect();

        report.push(CredentialStatus {
            key: BEARER_CREDENTIAL_KEY.to_string(),
            required: false,
            present: self.bearer_token.is_some(),
            masked: self.bearer_token.as_deref().map(mask_secret),
        });

        report
    }
}

fn check_shape(key: &str, value: &str) -> PostResult<()> {
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(PostError::MalformedCredential {
            key: key.to_string(),
            reason: "contains whitespace or control characters".into(),
        });
    }
    Ok(())
}

/// Masked presence record for one credential. Never carries the full value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialStatus {
    /// Environment variable name.
    pub key: String,

    /// Whether the key must be set for the client to operate.
    pub required: bool,

    /// Whether a non-empty value was found.
    pub present: bool,

    /// Last four characters of the value, prefixed with `****`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked: Option<String>,
}

fn mask_secret(value: &str) -> String {
    let tail: String = value
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{tail}")
}
