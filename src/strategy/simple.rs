//! Single-request multipart upload strategy.
//!
//! The whole asset goes up in one multipart POST. Comes in two flavors that
//! differ only in authentication: OAuth 1.0a user context and app-only
//! Bearer. Images only; the chunked strategy covers everything larger.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::client::{ApiClient, AuthMode};
use crate::error::PostResult;
use crate::media::{MediaAsset, MediaHandle};
use crate::strategy::UploadStrategy;

/// 5 MiB, the remote limit for single-request image uploads.
const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Single-request multipart upload.
pub struct SimpleUpload {
    name: &'static str,
    auth: AuthMode,
    max_bytes: u64,
}

impl SimpleUpload {
    /// OAuth 1.0a user-context variant.
    #[must_use]
    pub fn oauth1() -> Self {
        Self {
            name: "simple_oauth1",
            auth: AuthMode::OAuth1,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    /// App-only Bearer variant. Only meaningful when a bearer token is
    /// configured.
    #[must_use]
    pub fn bearer() -> Self {
        Self {
            name: "simple_bearer",
            auth: AuthMode::Bearer,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    /// Override the size limit.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl UploadStrategy for SimpleUpload {
    fn name(&self) -> &'static str {
        self.name
    }

    fn max_bytes(&self, _asset: &MediaAsset) -> Option<u64> {
        Some(self.max_bytes)
    }

    async fn upload(
        &self,
        client: &ApiClient,
        asset: &MediaAsset,
        deadline: Option<Instant>,
    ) -> PostResult<MediaHandle> {
        let response = client
            .upload_multipart(
                self.auth,
                asset.file_name(),
                asset.mime(),
                asset.category().as_str(),
                asset.data().to_vec(),
                deadline,
            )
            .await?;
        Ok(MediaHandle(response.media_id_string))
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
            bearer_token: Some("bt".into()),
            api_url: mock_server.uri(),
            upload_url: mock_server.uri(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn uploads_asset_as_multipart_and_returns_handle() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("tweet_image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "media_id": 710511363345354753u64,
                "media_id_string": "710511363345354753"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(&test_config(&mock_server)).unwrap();
        let asset = MediaAsset::from_bytes("image.png", "image/png", vec![0u8; 64]);

        let handle = SimpleUpload::oauth1()
            .upload(&client, &asset, None)
            .await
            .unwrap();
        assert_eq!(handle.0, "710511363345354753");
    }

    #[test]
    fn default_limit_is_five_mebibytes() {
        let asset = MediaAsset::from_bytes("image.png", "image/png", vec![]);
        assert_eq!(
            SimpleUpload::oauth1().max_bytes(&asset),
            Some(5 * 1024 * 1024)
        );
        assert_eq!(
            SimpleUpload::bearer().with_max_bytes(100).max_bytes(&asset),
            Some(100)
        );
    }
}
