//! Posting service: upload-then-post orchestration.
//!
//! One logical operation per request: the credential gate runs once at
//! construction, the asset is verified before any network call, the chain
//! uploads, and the tweet is created referencing the media handle. The
//! service holds only read-only state and is re-entrant across concurrent
//! callers.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, instrument};

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::PostResult;
use crate::media::MediaAsset;
use crate::report::UploadAttempt;
use crate::strategy::UploadChain;
use crate::types::{CreateTweetRequest, TweetMedia};

/// Result of a successful post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostReceipt {
    /// Identifier of the created post.
    pub tweet_id: String,

    /// Media handle attached to the post, when media was uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,

    /// Upload attempts made on the way, including the succeeding one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<UploadAttempt>,
}

/// High-level client: validates credentials once, then posts text with
/// optional media through the strategy chain.
pub struct PostService {
    client: ApiClient,
    chain: UploadChain,
}

impl std::fmt::Debug for PostService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostService")
            .field("client", &self.client)
            .field("chain", &self.chain.strategy_names())
            .finish()
    }
}

impl PostService {
    /// Build the service, failing fast on absent or malformed credentials.
    pub fn new(config: Config) -> PostResult<Self> {
        config.validate_credentials()?;
        let client = ApiClient::new(&config)?;
        let chain = UploadChain::from_config(&config);
        Ok(Self { client, chain })
    }

    /// Build the service with an explicit strategy chain.
    pub fn with_chain(config: Config, chain: UploadChain) -> PostResult<Self> {
        config.validate_credentials()?;
        let client = ApiClient::new(&config)?;
        Ok(Self { client, chain })
    }

    /// The underlying API client.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Post text with optional media, bounded by an optional deadline.
    ///
    /// The deadline propagates into every upload attempt and the final
    /// post-creation call; when it expires mid-chain the caller gets a
    /// `Deadline` failure instead of further attempts.
    #[instrument(skip(self, asset), fields(has_media = asset.is_some()))]
    pub async fn post(
        &self,
        text: &str,
        asset: Option<MediaAsset>,
        deadline: Option<Instant>,
    ) -> PostResult<PostReceipt> {
        let (media, attempts) = match asset {
            Some(asset) => {
                info!(asset = %asset.describe(), "uploading media");
                let (handle, attempts) = self.chain.run(&self.client, &asset, deadline).await?;
                (Some(handle), attempts)
            }
            None => (None, Vec::new()),
        };

        let request = CreateTweetRequest {
            text: text.to_string(),
            media: media.as_ref().map(|handle| TweetMedia {
                media_ids: vec![handle.0.clone()],
            }),
        };
        let response = self.client.create_tweet(&request, deadline).await?;
        info!(tweet_id = %response.data.id, "post created");

        Ok(PostReceipt {
            tweet_id: response.data.id,
            media_id: media.map(|h| h.0),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PostError;

    fn config() -> Config {
        Config {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            access_token: "at".into(),
            access_token_secret: "ats".into(),
            ..Default::default()
        }
    }

    #[test]
    fn construction_fails_fast_on_missing_credentials() {
        let incomplete = Config {
            consumer_secret: String::new(),
            ..config()
        };
        let err = PostService::new(incomplete).unwrap_err();
        match err {
            PostError::MissingCredential { keys } => {
                assert_eq!(keys, vec!["TWITTER_API_SECRET".to_string()]);
            }
            other => panic!("expected MissingCredential, got {other:?}"),
        }
    }

    #[test]
    fn construction_succeeds_with_valid_credentials() {
        assert!(PostService::new(config()).is_ok());
    }
}
