//! End-to-end posting flows against a mock HTTP server.
//!
//! Exercises the full service path: strategy chain fallback, failure
//! aggregation, and deadline behavior, with size limits scaled down so the
//! fixtures stay small.

use std::time::Duration;

use tokio::time::Instant;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xpost::config::{Config, RetryConfig};
use xpost::error::PostError;
use xpost::media::MediaAsset;
use xpost::report::{AttemptOutcome, ErrorKind};
use xpost::service::PostService;
use xpost::strategy::{ChunkedUpload, SimpleUpload, UploadChain, UploadStrategy};

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

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        initial_delay_ms: 1,
        max_delay_ms: 5,
    }
}

fn png(size: usize) -> MediaAsset {
    MediaAsset::from_bytes("image.png", "image/png", vec![0u8; size])
}

async fn mount_tweet_created(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": {"id": "1850", "text": "hello"}
        })))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn chunked_failure_falls_back_to_simple_upload() {
    let mock_server = MockServer::start().await;

    // Segmented INIT keeps failing; the chain falls back to the
    // single-request path.
    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .and(body_string_contains("INIT"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    // Single-request multipart carries the media_category field.
    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .and(body_string_contains("tweet_image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "media_id": 99,
            "media_id_string": "99"
        })))
        .mount(&mock_server)
        .await;

    mount_tweet_created(&mock_server).await;

    let config = test_config(&mock_server);
    let chain = UploadChain::new(
        vec![
            Box::new(ChunkedUpload::new(4)),
            Box::new(SimpleUpload::oauth1()),
        ],
        fast_retry(),
    );
    let service = PostService::with_chain(config, chain).unwrap();

    let receipt = service.post("hello", Some(png(8)), None).await.unwrap();

    assert_eq!(receipt.tweet_id, "1850");
    assert_eq!(receipt.media_id.as_deref(), Some("99"));
    assert_eq!(receipt.attempts.len(), 2);
    assert_eq!(receipt.attempts[0].strategy, "chunked");
    assert!(!receipt.attempts[0].succeeded());
    assert_eq!(receipt.attempts[1].strategy, "simple_oauth1");
    assert!(receipt.attempts[1].succeeded());
}

#[tokio::test]
async fn exhausted_strategies_surface_an_aggregate_report() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "errors": [{"code": 324, "message": "Media rejected by policy"}]
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let chain = UploadChain::new(
        vec![
            Box::new(ChunkedUpload::new(4)),
            Box::new(SimpleUpload::oauth1()),
        ],
        fast_retry(),
    );
    let service = PostService::with_chain(config, chain).unwrap();

    let err = service.post("hello", Some(png(8)), None).await.unwrap_err();
    match err {
        PostError::AllStrategiesExhausted(report) => {
            let names: Vec<_> = report.attempts.iter().map(|a| a.strategy.as_str()).collect();
            assert_eq!(names, vec!["chunked", "simple_oauth1"]);
            for attempt in &report.attempts {
                match &attempt.outcome {
                    AttemptOutcome::Failed { kind, status, message } => {
                        assert_eq!(*kind, ErrorKind::RemoteRejected);
                        assert_eq!(*status, Some(403));
                        assert!(message.contains("Media rejected by policy"));
                    }
                    other => panic!("expected Failed, got {other:?}"),
                }
            }
            // The rendered report enumerates every attempt for operators.
            let rendered = report.to_string();
            assert!(rendered.contains("1. chunked"));
            assert!(rendered.contains("2. simple_oauth1"));
        }
        other => panic!("expected AllStrategiesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn oversized_asset_is_skipped_without_a_network_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .and(body_string_contains("INIT"))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "media_id": 7,
            "media_id_string": "7"
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
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "media_id": 7,
            "media_id_string": "7"
        })))
        .mount(&mock_server)
        .await;
    mount_tweet_created(&mock_server).await;

    // Limits scaled down: the 50-byte asset is over the single-request cap
    // but under the chunked cap.
    let config = test_config(&mock_server);
    let chain = UploadChain::new(
        vec![
            Box::new(SimpleUpload::oauth1().with_max_bytes(5)),
            Box::new(ChunkedUpload::new(16).with_max_bytes(500)),
        ],
        fast_retry(),
    );
    let service = PostService::with_chain(config, chain).unwrap();

    let receipt = service.post("hello", Some(png(50)), None).await.unwrap();

    assert_eq!(receipt.attempts.len(), 2);
    match &receipt.attempts[0].outcome {
        AttemptOutcome::Skipped { kind, .. } => assert_eq!(*kind, ErrorKind::SizeUnsupported),
        other => panic!("expected Skipped, got {other:?}"),
    }
    assert!(receipt.attempts[1].succeeded());
    assert_eq!(receipt.media_id.as_deref(), Some("7"));
}

#[tokio::test]
async fn http_413_then_size_skip_exhausts_with_both_attempts() {
    let mock_server = MockServer::start().await;

    // Only the chunked INIT ever reaches the server; 413 is not retryable.
    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .respond_with(ResponseTemplate::new(413))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The asset fits the chunked cap but not the single-request cap, so the
    // fallback is skipped without a request.
    let config = test_config(&mock_server);
    let chain = UploadChain::new(
        vec![
            Box::new(ChunkedUpload::new(16).with_max_bytes(500)),
            Box::new(SimpleUpload::oauth1().with_max_bytes(5)),
        ],
        fast_retry(),
    );
    let service = PostService::with_chain(config, chain).unwrap();

    let err = service.post("hello", Some(png(50)), None).await.unwrap_err();
    match err {
        PostError::AllStrategiesExhausted(report) => {
            assert_eq!(report.attempts.len(), 2);
            assert_eq!(report.attempts[0].retries, 0);
            match &report.attempts[0].outcome {
                AttemptOutcome::Failed { kind, status, .. } => {
                    assert_eq!(*kind, ErrorKind::RemoteRejected);
                    assert_eq!(*status, Some(413));
                }
                other => panic!("expected Failed, got {other:?}"),
            }
            match &report.attempts[1].outcome {
                AttemptOutcome::Skipped { kind, .. } => {
                    assert_eq!(*kind, ErrorKind::SizeUnsupported);
                }
                other => panic!("expected Skipped, got {other:?}"),
            }
        }
        other => panic!("expected AllStrategiesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn transient_failures_retry_until_the_server_recovers() {
    let mock_server = MockServer::start().await;

    // First try hits the rate limit, second succeeds.
    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("retry-after", "0"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "media_id": 42,
            "media_id_string": "42"
        })))
        .mount(&mock_server)
        .await;
    mount_tweet_created(&mock_server).await;

    let config = test_config(&mock_server);
    let chain = UploadChain::new(vec![Box::new(SimpleUpload::oauth1())], fast_retry());
    let service = PostService::with_chain(config, chain).unwrap();

    let receipt = service.post("hello", Some(png(8)), None).await.unwrap();

    assert_eq!(receipt.attempts.len(), 1);
    assert!(receipt.attempts[0].succeeded());
    assert_eq!(receipt.attempts[0].retries, 1);
}

#[tokio::test]
async fn deadline_expiry_aborts_the_chain_with_attempts_so_far() {
    let mock_server = MockServer::start().await;

    // The server stalls longer than the caller is willing to wait.
    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(serde_json::json!({
                    "media_id": 1,
                    "media_id_string": "1"
                })),
        )
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let chain = UploadChain::new(
        vec![
            Box::new(SimpleUpload::oauth1()),
            Box::new(SimpleUpload::bearer()),
        ],
        fast_retry(),
    );
    let service = PostService::with_chain(config, chain).unwrap();

    let deadline = Instant::now() + Duration::from_millis(100);
    let err = service
        .post("hello", Some(png(8)), Some(deadline))
        .await
        .unwrap_err();

    match err {
        PostError::Deadline { attempts } => {
            // The first strategy timed out; the second was never started.
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].strategy, "simple_oauth1");
            assert!(!attempts[0].succeeded());
        }
        other => panic!("expected Deadline, got {other:?}"),
    }
}

#[tokio::test]
async fn text_only_post_skips_the_upload_chain() {
    let mock_server = MockServer::start().await;
    mount_tweet_created(&mock_server).await;

    let service = PostService::new(test_config(&mock_server)).unwrap();
    let receipt = service.post("hello", None, None).await.unwrap();

    assert_eq!(receipt.tweet_id, "1850");
    assert!(receipt.media_id.is_none());
    assert!(receipt.attempts.is_empty());
}

#[tokio::test]
async fn default_chain_respects_configured_strategy_order() {
    let config = Config {
        bearer_token: Some("bt".into()),
        ..test_config(&MockServer::start().await)
    };
    let chain = UploadChain::from_config(&config);
    assert_eq!(
        chain.strategy_names(),
        vec!["chunked", "simple_oauth1", "simple_bearer"]
    );

    // The trait object order is what the service will execute.
    let strategies: Vec<Box<dyn UploadStrategy>> = vec![Box::new(SimpleUpload::oauth1())];
    let custom = UploadChain::new(strategies, RetryConfig::default());
    assert_eq!(custom.strategy_names(), vec!["simple_oauth1"]);
}
