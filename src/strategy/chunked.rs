//! Chunked (segmented) upload strategy: INIT → APPEND → FINALIZE → STATUS.
//!
//! The most capable strategy: supports video and large GIFs and is tried
//! first in the default chain. After FINALIZE the remote may keep processing
//! asynchronously; the strategy polls STATUS until the upload settles or the
//! deadline runs out.
//!
//! Cleanup contract: a failed session is not explicitly aborted remotely.
//! INIT returns `expires_after_secs` and abandoned segments age out
//! server-side, so the chain moves on to the next strategy immediately.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::{PostError, PostResult};
use crate::media::{MediaAsset, MediaCategory, MediaHandle};
use crate::strategy::UploadStrategy;

const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_GIF_BYTES: u64 = 15 * 1024 * 1024;
const MAX_VIDEO_BYTES: u64 = 512 * 1024 * 1024;

/// Fallback poll interval when STATUS omits `check_after_secs`.
const DEFAULT_POLL_SECS: u64 = 1;

/// Chunked upload via the segmented v1.1 protocol.
pub struct ChunkedUpload {
    chunk_size: usize,
    max_bytes_override: Option<u64>,
}

impl ChunkedUpload {
    /// Create the strategy with the configured APPEND chunk size.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            max_bytes_override: None,
        }
    }

    /// Override the per-category size limits with a single uniform cap.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes_override = Some(max_bytes);
        self
    }

    /// Wait for remote processing to settle after FINALIZE.
    async fn await_processing(
        &self,
        client: &ApiClient,
        media_id: &str,
        mut info: crate::types::ProcessingInfo,
        deadline: Option<Instant>,
    ) -> PostResult<()> {
        loop {
            if info.state == "failed" {
                let message = info
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "remote media processing failed".into());
                return Err(PostError::RemoteRejected {
                    status: 400,
                    message,
                });
            }
            if !info.is_pending() {
                return Ok(());
            }

            let wait = Duration::from_secs(info.check_after_secs.unwrap_or(DEFAULT_POLL_SECS));
            debug!(media_id, state = %info.state, wait_secs = wait.as_secs(), "media still processing");
            if let Some(d) = deadline {
                if Instant::now() + wait >= d {
                    return Err(PostError::Deadline { attempts: vec![] });
                }
            }
            tokio::time::sleep(wait).await;

            let status = client.media_status(media_id, deadline).await?;
            match status.processing_info {
                Some(next) => info = next,
                None => return Ok(()),
            }
        }
    }
}

#[async_trait]
impl UploadStrategy for ChunkedUpload {
    fn name(&self) -> &'static str {
        "chunked"
    }

    fn max_bytes(&self, asset: &MediaAsset) -> Option<u64> {
        if let Some(limit) = self.max_bytes_override {
            return Some(limit);
        }
        Some(match asset.category() {
            MediaCategory::TweetImage => MAX_IMAGE_BYTES,
            MediaCategory::TweetGif => MAX_GIF_BYTES,
            MediaCategory::TweetVideo => MAX_VIDEO_BYTES,
        })
    }

    async fn upload(
        &self,
        client: &ApiClient,
        asset: &MediaAsset,
        deadline: Option<Instant>,
    ) -> PostResult<MediaHandle> {
        // INIT opens a segmented-upload session.
        let init = client
            .media_command(
                &[
                    ("command".to_string(), "INIT".to_string()),
                    ("total_bytes".to_string(), asset.size().to_string()),
                    ("media_type".to_string(), asset.mime().to_string()),
                    (
                        "media_category".to_string(),
                        asset.category().as_str().to_string(),
                    ),
                ],
                deadline,
            )
            .await?;
        let media_id = init.media_id_string;
        debug!(
            media_id,
            expires_after_secs = ?init.expires_after_secs,
            "segmented upload session opened"
        );

        for (segment_index, chunk) in asset.data().chunks(self.chunk_size).enumerate() {
            client
                .media_append(
                    &media_id,
                    segment_index,
                    asset.file_name(),
                    asset.mime(),
                    chunk.to_vec(),
                    deadline,
                )
                .await?;
        }

        let finalized = client
            .media_command(
                &[
                    ("command".to_string(), "FINALIZE".to_string()),
                    ("media_id".to_string(), media_id.clone()),
                ],
                deadline,
            )
            .await?;

        if let Some(info) = finalized.processing_info {
            self.await_processing(client, &media_id, info, deadline)
                .await?;
        }

        Ok(MediaHandle(media_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path},
    };

    fn test_config(mock_server: &MockServer) -> Config {
        Config {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            access_token: "at".into(),
            access_token_secret: "ats".into(),
            api_url: mock_server.uri(),
            upload_url: mock_server.uri(),
            chunk_size: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn uploads_in_segments_and_finalizes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("INIT"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "media_id": 710,
                "media_id_string": "710",
                "expires_after_secs": 86400
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        // 10 bytes with chunk_size 4 → segments 0, 1, 2.
        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("APPEND"))
            .respond_with(ResponseTemplate::new(204))
            .expect(3)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("FINALIZE"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "media_id": 710,
                "media_id_string": "710"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(&test_config(&mock_server)).unwrap();
        let asset = MediaAsset::from_bytes("clip.mp4", "video/mp4", vec![0u8; 10]);

        let handle = ChunkedUpload::new(4)
            .upload(&client, &asset, None)
            .await
            .unwrap();
        assert_eq!(handle.0, "710");
    }

    #[tokio::test]
    async fn polls_status_until_processing_succeeds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("INIT"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "media_id": 711,
                "media_id_string": "711"
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("APPEND"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("FINALIZE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "media_id": 711,
                "media_id_string": "711",
                "processing_info": {"state": "pending", "check_after_secs": 0}
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/1.1/media/upload.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "media_id": 711,
                "media_id_string": "711",
                "processing_info": {"state": "succeeded", "progress_percent": 100}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(&test_config(&mock_server)).unwrap();
        let asset = MediaAsset::from_bytes("clip.mp4", "video/mp4", vec![0u8; 4]);

        let handle = ChunkedUpload::new(4)
            .upload(&client, &asset, None)
            .await
            .unwrap();
        assert_eq!(handle.0, "711");
    }

    #[tokio::test]
    async fn failed_processing_is_remote_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("INIT"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "media_id": 712,
                "media_id_string": "712"
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("APPEND"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("FINALIZE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "media_id": 712,
                "media_id_string": "712",
                "processing_info": {
                    "state": "failed",
                    "error": {"code": 1, "name": "InvalidMedia", "message": "Unsupported video format"}
                }
            })))
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(&test_config(&mock_server)).unwrap();
        let asset = MediaAsset::from_bytes("clip.mp4", "video/mp4", vec![0u8; 4]);

        let err = ChunkedUpload::new(4)
            .upload(&client, &asset, None)
            .await
            .unwrap_err();
        match err {
            PostError::RemoteRejected { message, .. } => {
                assert_eq!(message, "Unsupported video format");
            }
            other => panic!("expected RemoteRejected, got {other:?}"),
        }
    }

    #[test]
    fn limits_follow_media_category() {
        let strategy = ChunkedUpload::new(1024);
        let image = MediaAsset::from_bytes("a.png", "image/png", vec![]);
        let gif = MediaAsset::from_bytes("a.gif", "image/gif", vec![]);
        let video = MediaAsset::from_bytes("a.mp4", "video/mp4", vec![]);

        assert_eq!(strategy.max_bytes(&image), Some(5 * 1024 * 1024));
        assert_eq!(strategy.max_bytes(&gif), Some(15 * 1024 * 1024));
        assert_eq!(strategy.max_bytes(&video), Some(512 * 1024 * 1024));

        let capped = ChunkedUpload::new(1024).with_max_bytes(500);
        assert_eq!(capped.max_bytes(&video), Some(500));
    }
}
