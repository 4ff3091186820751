//! Upload strategies and the ordered fallback chain.
//!
//! Each strategy is one concrete method of getting an asset to the remote
//! media API. The chain tries them in a fixed priority order (most capable
//! first), short-circuits on the first success, and hands back the full
//! attempt list when everything fails.

mod chunked;
mod simple;

pub use chunked::ChunkedUpload;
pub use simple::SimpleUpload;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::config::{Config, RetryConfig};
use crate::error::{PostError, PostResult};
use crate::media::{MediaAsset, MediaHandle};
use crate::report::{AggregateFailure, ErrorKind, UploadAttempt};

/// One concrete method of uploading a media asset.
///
/// Implementations differ in request shape but share this contract: attempt
/// the upload, return a media handle or a classified error. Strategies do
/// not retry internally; the chain owns the bounded retry policy.
#[async_trait]
pub trait UploadStrategy: Send + Sync {
    /// Stable strategy name used in attempt records and logs.
    fn name(&self) -> &'static str;

    /// Largest asset this strategy supports, or `None` for no limit.
    fn max_bytes(&self, asset: &MediaAsset) -> Option<u64>;

    /// Attempt the upload once.
    async fn upload(
        &self,
        client: &ApiClient,
        asset: &MediaAsset,
        deadline: Option<Instant>,
    ) -> PostResult<MediaHandle>;
}

/// Ordered fallback chain over upload strategies.
pub struct UploadChain {
    strategies: Vec<Box<dyn UploadStrategy>>,
    retry: RetryConfig,
}

impl UploadChain {
    /// Build a chain with an explicit strategy order.
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn UploadStrategy>>, retry: RetryConfig) -> Self {
        Self { strategies, retry }
    }

    /// Default chain for a configuration: chunked upload first (broadest
    /// size/type support), then single-request OAuth1 upload, then the
    /// bearer-token fallback when a bearer token is configured.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut strategies: Vec<Box<dyn UploadStrategy>> = vec![
            Box::new(ChunkedUpload::new(config.chunk_size)),
            Box::new(SimpleUpload::oauth1()),
        ];
        if config.bearer_token.is_some() {
            strategies.push(Box::new(SimpleUpload::bearer()));
        }
        Self::new(strategies, config.retry.clone())
    }

    /// Strategy names in priority order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Execute strategies in order until one succeeds or the list is
    /// exhausted.
    ///
    /// Returns the media handle together with every attempt recorded on the
    /// way, including the succeeding one. On exhaustion the error carries
    /// the full attempt list; an expired deadline aborts the chain with the
    /// attempts recorded so far.
    pub async fn run(
        &self,
        client: &ApiClient,
        asset: &MediaAsset,
        deadline: Option<Instant>,
    ) -> PostResult<(MediaHandle, Vec<UploadAttempt>)> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            if deadline_expired(deadline) {
                return Err(PostError::Deadline { attempts });
            }

            // Size gate: a known-too-large asset is recorded without
            // spending a network round trip.
            if let Some(limit) = strategy.max_bytes(asset) {
                if asset.size() > limit {
                    debug!(
                        strategy = strategy.name(),
                        size = asset.size(),
                        limit,
                        "skipping strategy, asset exceeds size limit"
                    );
                    attempts.push(UploadAttempt::begin(strategy.name()).skip(
                        ErrorKind::SizeUnsupported,
                        format!("{} bytes exceeds {limit} byte limit", asset.size()),
                    ));
                    continue;
                }
            }

            let pending = UploadAttempt::begin(strategy.name());
            match self
                .try_strategy(strategy.as_ref(), client, asset, deadline)
                .await
            {
                (Ok(handle), retries) => {
                    info!(
                        strategy = strategy.name(),
                        media_id = %handle,
                        retries,
                        "media upload succeeded"
                    );
                    attempts.push(pending.succeed(handle.0.clone(), asset.size(), retries));
                    return Ok((handle, attempts));
                }
                (Err(e), retries) => {
                    warn!(
                        strategy = strategy.name(),
                        error = %e,
                        retries,
                        "upload strategy failed"
                    );
                    let kind = e.kind();
                    attempts.push(pending.fail(kind, e.status(), e.to_string(), retries));
                    if kind == ErrorKind::Deadline {
                        return Err(PostError::Deadline { attempts });
                    }
                }
            }
        }

        Err(PostError::AllStrategiesExhausted(AggregateFailure::new(
            attempts,
        )))
    }

    /// Run one strategy with the bounded in-strategy retry policy. Returns
    /// the final outcome and the number of retries consumed.
    async fn try_strategy(
        &self,
        strategy: &dyn UploadStrategy,
        client: &ApiClient,
        asset: &MediaAsset,
        deadline: Option<Instant>,
    ) -> (PostResult<MediaHandle>, u32) {
        let mut delay = Duration::from_millis(self.retry.initial_delay_ms);
        let mut retries = 0u32;

        loop {
            let result = strategy.upload(client, asset, deadline).await;
            match result {
                Err(e)
                    if e.is_retryable()
                        && retries + 1 < self.retry.max_attempts
                        && !deadline_expired(deadline) =>
                {
                    if let Some(suggested) = e.retry_after() {
                        delay = suggested;
                    }
                    warn!(
                        strategy = strategy.name(),
                        retry = retries + 1,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying strategy after transient failure"
                    );
                    sleep_within(delay, deadline).await;
                    delay = std::cmp::min(
                        delay * 2,
                        Duration::from_millis(self.retry.max_delay_ms),
                    );
                    retries += 1;
                }
                other => return (other, retries),
            }
        }
    }
}

fn deadline_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Sleep for `delay`, but never past the caller's deadline.
async fn sleep_within(delay: Duration, deadline: Option<Instant>) {
    let delay = match deadline {
        Some(d) => delay.min(d.saturating_duration_since(Instant::now())),
        None => delay,
    };
    tokio::time::sleep(delay).await;
}
