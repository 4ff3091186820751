//! HTTP plumbing for the media-upload and tweet endpoints.
//!
//! `ApiClient` owns the `reqwest` client, signs requests (OAuth 1.0a user
//! context or app-only Bearer), bounds every call with a timeout derived
//! from the caller's deadline, and classifies non-success responses into the
//! crate's error taxonomy. It performs no retries itself; the upload chain
//! owns the bounded in-strategy retry policy.

use std::time::Duration;

use reqwest::{Response, StatusCode, header::HeaderMap};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{PostError, PostResult};
use crate::oauth::OAuthSigner;
use crate::types::{
    CreateTweetRequest, CreateTweetResponse, MediaUploadResponse, UserResponse, V1ErrorBody,
    V2ErrorBody, VerifiedUser,
};

/// Authentication scheme for an individual request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// OAuth 1.0a user context (HMAC-SHA1 signed).
    OAuth1,
    /// OAuth 2.0 app-only bearer token.
    Bearer,
}

/// Client for the remote media-upload and post-creation endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_url: String,
    upload_url: String,
    signer: OAuthSigner,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> PostResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("xpost/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PostError::Http)?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            upload_url: config.upload_url.trim_end_matches('/').to_string(),
            signer: OAuthSigner::new(config),
            bearer_token: config.bearer_token.clone(),
            timeout: config.timeout,
        })
    }

    /// Whether a bearer token is configured.
    #[must_use]
    pub fn has_bearer_token(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// The media upload endpoint URL.
    #[must_use]
    pub fn media_endpoint(&self) -> String {
        format!("{}/1.1/media/upload.json", self.upload_url)
    }

    /// Per-request timeout bounded by the caller's deadline. An already
    /// expired deadline fails with `Deadline` instead of issuing the call.
    fn request_timeout(&self, deadline: Option<Instant>) -> PostResult<Duration> {
        match deadline {
            None => Ok(self.timeout),
            Some(d) => {
                let now = Instant::now();
                if now >= d {
                    Err(PostError::Deadline { attempts: vec![] })
                } else {
                    Ok(self.timeout.min(d - now))
                }
            }
        }
    }

    fn auth_header(
        &self,
        auth: AuthMode,
        method: &str,
        url: &str,
        signed_params: &[(String, String)],
    ) -> PostResult<String> {
        match auth {
            AuthMode::OAuth1 => self.signer.authorization_header(method, url, signed_params),
            AuthMode::Bearer => {
                let bearer = self.bearer_token.as_ref().ok_or_else(|| {
                    PostError::MissingCredential {
                        keys: vec![crate::config::BEARER_CREDENTIAL_KEY.to_string()],
                    }
                })?;
                Ok(format!("Bearer {bearer}"))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Media upload primitives
    // ─────────────────────────────────────────────────────────────────────

    /// Single-request multipart upload of a complete asset.
    ///
    /// The multipart body is excluded from the OAuth signature, per the
    /// upload endpoint's contract.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn upload_multipart(
        &self,
        auth: AuthMode,
        file_name: &str,
        mime: &str,
        category: &str,
        data: Vec<u8>,
        deadline: Option<Instant>,
    ) -> PostResult<MediaUploadResponse> {
        let url = self.media_endpoint();
        let timeout = self.request_timeout(deadline)?;
        let authorization = self.auth_header(auth, "POST", &url, &[])?;

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(PostError::Http)?;
        let form = reqwest::multipart::Form::new()
            .text("media_category", category.to_string())
            .text("media_type", mime.to_string())
            .part("media", part);

        let response = self
            .http
            .post(&url)
            .header("Authorization", authorization)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await?;

        self.read_json(response).await
    }

    /// Form-encoded media command (INIT, FINALIZE). Parameters take part in
    /// the OAuth signature.
    #[instrument(skip(self))]
    pub async fn media_command(
        &self,
        params: &[(String, String)],
        deadline: Option<Instant>,
    ) -> PostResult<MediaUploadResponse> {
        let url = self.media_endpoint();
        let timeout = self.request_timeout(deadline)?;
        let authorization = self.auth_header(AuthMode::OAuth1, "POST", &url, params)?;

        let response = self
            .http
            .post(&url)
            .header("Authorization", authorization)
            .form(&params.iter().cloned().collect::<Vec<_>>())
            .timeout(timeout)
            .send()
            .await?;

        self.read_json(response).await
    }

    /// APPEND one segment of a chunked upload. Succeeds with an empty body.
    #[instrument(skip(self, chunk), fields(bytes = chunk.len()))]
    pub async fn media_append(
        &self,
        media_id: &str,
        segment_index: usize,
        file_name: &str,
        mime: &str,
        chunk: Vec<u8>,
        deadline: Option<Instant>,
    ) -> PostResult<()> {
        let url = self.media_endpoint();
        let timeout = self.request_timeout(deadline)?;
        let authorization = self.auth_header(AuthMode::OAuth1, "POST", &url, &[])?;

        let part = reqwest::multipart::Part::bytes(chunk)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(PostError::Http)?;
        let form = reqwest::multipart::Form::new()
            .text("command", "APPEND")
            .text("media_id", media_id.to_string())
            .text("segment_index", segment_index.to_string())
            .part("media", part);

        let response = self
            .http
            .post(&url)
            .header("Authorization", authorization)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let headers = response.headers().clone();
            let bytes = response.bytes().await?;
            Err(classify_status(status, &headers, &bytes))
        }
    }

    /// Poll the processing state of a finalized upload.
    #[instrument(skip(self))]
    pub async fn media_status(
        &self,
        media_id: &str,
        deadline: Option<Instant>,
    ) -> PostResult<MediaUploadResponse> {
        let url = self.media_endpoint();
        let timeout = self.request_timeout(deadline)?;
        let params = vec![
            ("command".to_string(), "STATUS".to_string()),
            ("media_id".to_string(), media_id.to_string()),
        ];
        let authorization = self.auth_header(AuthMode::OAuth1, "GET", &url, &params)?;

        let response = self
            .http
            .get(format!("{url}?command=STATUS&media_id={media_id}"))
            .header("Authorization", authorization)
            .timeout(timeout)
            .send()
            .await?;

        self.read_json(response).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tweet endpoints
    // ─────────────────────────────────────────────────────────────────────

    /// Create a tweet, optionally referencing uploaded media.
    #[instrument(skip(self, request), fields(media = request.media.is_some()))]
    pub async fn create_tweet(
        &self,
        request: &CreateTweetRequest,
        deadline: Option<Instant>,
    ) -> PostResult<CreateTweetResponse> {
        let url = format!("{}/2/tweets", self.api_url);
        let timeout = self.request_timeout(deadline)?;
        let authorization = self.auth_header(AuthMode::OAuth1, "POST", &url, &[])?;

        debug!(url = %url, "creating tweet");
        let response = self
            .http
            .post(&url)
            .header("Authorization", authorization)
            .json(request)
            .timeout(timeout)
            .send()
            .await?;

        self.read_json(response).await
    }

    /// Confirm the credentials with a read-only call to `/2/users/me`.
    #[instrument(skip(self))]
    pub async fn verify_credentials(
        &self,
        deadline: Option<Instant>,
    ) -> PostResult<VerifiedUser> {
        let url = format!("{}/2/users/me", self.api_url);
        let timeout = self.request_timeout(deadline)?;
        let authorization = self.auth_header(AuthMode::OAuth1, "GET", &url, &[])?;

        let response = self
            .http
            .get(&url)
            .header("Authorization", authorization)
            .timeout(timeout)
            .send()
            .await?;

        let user: UserResponse = self.read_json(response).await?;
        Ok(user.data)
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> PostResult<T> {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(PostError::from)
        } else {
            Err(classify_status(status, &headers, &bytes))
        }
    }
}

/// Map a non-success response into the error taxonomy.
///
/// 408, 429, and 5xx are transient and locally retryable; everything else is
/// a remote rejection carrying the parsed remote message.
fn classify_status(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> PostError {
    let message = parse_remote_message(body);
    let code = status.as_u16();

    if code == 408 || code == 429 || status.is_server_error() {
        PostError::TransientNetwork {
            message,
            status: Some(code),
            retry_after: retry_after_from_headers(headers),
        }
    } else {
        PostError::RemoteRejected {
            status: code,
            message,
        }
    }
}

/// Extract the remote error message from either the v2 or v1.1 body shape,
/// falling back to raw (truncated) body text.
fn parse_remote_message(body: &[u8]) -> String {
    if let Ok(v2) = serde_json::from_slice::<V2ErrorBody>(body) {
        if let Some(message) = v2.detail.or(v2.title) {
            return message;
        }
    }
    if let Ok(v1) = serde_json::from_slice::<V1ErrorBody>(body) {
        if let Some(message) = v1.errors.into_iter().find_map(|e| e.message) {
            return message;
        }
        if let Some(message) = v1.error {
            return message;
        }
    }

    let raw = String::from_utf8_lossy(body);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Remote-suggested retry delay: `retry-after` seconds, or the time until
/// the `x-rate-limit-reset` epoch.
fn retry_after_from_headers(headers: &HeaderMap) -> Option<Duration> {
    if let Some(secs) = headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        return Some(Duration::from_secs(secs));
    }

    let reset = headers
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())?;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs();
    (reset > now).then(|| Duration::from_secs(reset - now))
}
