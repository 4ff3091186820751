//! Wire types for the media-upload (v1.1) and tweet (v2) endpoints.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Media upload (v1.1)
// ─────────────────────────────────────────────────────────────────────────────

/// Response from the media upload endpoint (INIT, FINALIZE, STATUS, and
/// single-request uploads all share this shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUploadResponse {
    /// Media identifier as a string; the form safe to use in tweet creation.
    pub media_id_string: String,

    /// Numeric media identifier.
    #[serde(default)]
    pub media_id: Option<u64>,

    /// Seconds until an unfinished segmented-upload session expires
    /// server-side. Returned by INIT.
    #[serde(default)]
    pub expires_after_secs: Option<u64>,

    /// Uploaded size echoed back by the endpoint.
    #[serde(default)]
    pub size: Option<u64>,

    /// Asynchronous processing state, present for video/GIF finalization.
    #[serde(default)]
    pub processing_info: Option<ProcessingInfo>,
}

/// Remote-side processing state for a finalized upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingInfo {
    /// `pending`, `in_progress`, `succeeded`, or `failed`.
    pub state: String,

    /// Suggested seconds to wait before polling STATUS again.
    #[serde(default)]
    pub check_after_secs: Option<u64>,

    /// Completion percentage, 0-100.
    #[serde(default)]
    pub progress_percent: Option<u8>,

    /// Populated when `state == "failed"`.
    #[serde(default)]
    pub error: Option<ProcessingError>,
}

impl ProcessingInfo {
    /// Whether the remote is still working on the upload.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.state.as_str(), "pending" | "in_progress")
    }
}

/// Remote processing failure detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingError {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// v1.1 error body: `{"errors": [{"code": 32, "message": "..."}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct V1ErrorBody {
    #[serde(default)]
    pub errors: Vec<V1Error>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct V1Error {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tweets (v2)
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for `POST /2/tweets`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTweetRequest {
    /// Tweet text.
    pub text: String,

    /// Attached media, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<TweetMedia>,
}

/// Media attachment list for tweet creation.
#[derive(Debug, Clone, Serialize)]
pub struct TweetMedia {
    pub media_ids: Vec<String>,
}

/// Response from `POST /2/tweets`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTweetResponse {
    pub data: CreatedTweet,
}

/// The created tweet.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTweet {
    pub id: String,
    pub text: String,
}

/// Response wrapper for `GET /2/users/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub data: VerifiedUser,
}

/// The authenticated user, as returned by the credential round-trip check.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedUser {
    pub id: String,
    pub name: String,
    pub username: String,
}

/// v2 error body: `{"title": "...", "detail": "...", "status": 401}`.
#[derive(Debug, Clone, Deserialize)]
pub struct V2ErrorBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_upload_response_parses_init_shape() {
        let body = r#"{
            "media_id": 710511363345354753,
            "media_id_string": "710511363345354753",
            "expires_after_secs": 86400
        }"#;
        let parsed: MediaUploadResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.media_id_string, "710511363345354753");
        assert_eq!(parsed.expires_after_secs, Some(86400));
        assert!(parsed.processing_info.is_none());
    }

    #[test]
    fn processing_info_pending_states() {
        let pending: ProcessingInfo =
            serde_json::from_str(r#"{"state": "pending", "check_after_secs": 5}"#).unwrap();
        assert!(pending.is_pending());

        let failed: ProcessingInfo = serde_json::from_str(
            r#"{"state": "failed", "error": {"code": 1, "name": "InvalidMedia", "message": "Unsupported video format"}}"#,
        )
        .unwrap();
        assert!(!failed.is_pending());
        assert_eq!(
            failed.error.unwrap().message.as_deref(),
            Some("Unsupported video format")
        );
    }

    #[test]
    fn create_tweet_request_omits_empty_media() {
        let request = CreateTweetRequest {
            text: "hello".into(),
            media: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("media").is_none());

        let request = CreateTweetRequest {
            text: "hello".into(),
            media: Some(TweetMedia {
                media_ids: vec!["123".into()],
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["media"]["media_ids"][0], "123");
    }
}
