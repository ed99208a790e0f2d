// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use webconfig_jwks::{
	HttpKeySetFetcher, JwksError, KeySetCache, KeySetCacheConfig, KeySetFetcher, RefreshErrorHandler,
	RefreshOutcome,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWKS: &str = include_str!("fixtures/jwks.json");

async fn serve_jwks(server: &MockServer) {
	Mock::given(method("GET"))
		.and(path("/jwks"))
		.respond_with(ResponseTemplate::new(200).set_body_raw(JWKS, "application/json"))
		.mount(server)
		.await;
}

#[tokio::test]
async fn fetcher_parses_published_keys() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/jwks"))
		.and(header("accept", "application/json"))
		.respond_with(ResponseTemplate::new(200).set_body_raw(JWKS, "application/json"))
		.expect(1)
		.mount(&server)
		.await;

	let fetcher =
		HttpKeySetFetcher::new(format!("{}/jwks", server.uri()), Duration::from_secs(5)).unwrap();
	let keys = fetcher.fetch().await.unwrap();
	assert_eq!(keys.kids(), vec!["rotated_key", "webconfig_key"]);
}

#[tokio::test]
async fn fetcher_reports_error_status() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/jwks"))
		.respond_with(ResponseTemplate::new(503))
		.mount(&server)
		.await;

	let fetcher =
		HttpKeySetFetcher::new(format!("{}/jwks", server.uri()), Duration::from_secs(5)).unwrap();
	let err = fetcher.fetch().await.unwrap_err();
	assert!(matches!(err, JwksError::Status { status: 503 }));
	assert!(err.is_retryable());
}

#[tokio::test]
async fn fetcher_rejects_non_jwks_body() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/jwks"))
		.respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
		.mount(&server)
		.await;

	let fetcher =
		HttpKeySetFetcher::new(format!("{}/jwks", server.uri()), Duration::from_secs(5)).unwrap();
	let err = fetcher.fetch().await.unwrap_err();
	assert!(matches!(err, JwksError::InvalidDocument(_)));
}

#[tokio::test]
async fn start_performs_initial_fetch() {
	let server = MockServer::start().await;
	serve_jwks(&server).await;

	let config = KeySetCacheConfig::new(format!("{}/jwks", server.uri()));
	let (cache, task) = KeySetCache::start(config, None).await.unwrap();

	assert!(cache.resolve("webconfig_key").is_some());
	assert!(cache.resolve("rotated_key").is_some());
	assert!(cache.last_refreshed().is_some());
	task.cancel();
}

#[tokio::test]
async fn start_survives_unreachable_endpoint() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(500))
		.mount(&server)
		.await;

	let failures = Arc::new(AtomicUsize::new(0));
	let counter = failures.clone();
	let handler: RefreshErrorHandler = Arc::new(move |_: &JwksError| {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	let config = KeySetCacheConfig::new(format!("{}/jwks", server.uri()));
	let (cache, task) = KeySetCache::start(config, Some(handler)).await.unwrap();

	assert!(cache.snapshot().is_empty());
	assert_eq!(failures.load(Ordering::SeqCst), 1);
	assert!(!task.is_finished());
	task.cancel();
}

#[tokio::test]
async fn start_rejects_invalid_config() {
	let config = KeySetCacheConfig::new("http://localhost/jwks")
		.with_refresh_interval(Duration::from_secs(10))
		.with_min_refresh_interval(Duration::from_secs(20));
	let err = KeySetCache::start(config, None).await.unwrap_err();
	assert!(matches!(err, JwksError::Configuration(_)));
}

#[tokio::test]
async fn slow_endpoint_hits_fetch_timeout() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/jwks"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_raw(JWKS, "application/json")
				.set_delay(Duration::from_secs(2)),
		)
		.mount(&server)
		.await;

	let config = KeySetCacheConfig::new(format!("{}/jwks", server.uri()))
		.with_min_refresh_interval(Duration::ZERO)
		.with_fetch_timeout(Duration::from_millis(200));
	let fetcher = Arc::new(
		HttpKeySetFetcher::new(config.source_uri.clone(), Duration::from_secs(30)).unwrap(),
	);
	let cache = KeySetCache::new(config, fetcher).unwrap();

	let err = cache.refresh().await.unwrap_err();
	assert!(matches!(err, JwksError::Timeout(_)));
}

#[tokio::test]
async fn rate_limit_bounds_requests_to_endpoint() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/jwks"))
		.respond_with(ResponseTemplate::new(200).set_body_raw(JWKS, "application/json"))
		.expect(1)
		.mount(&server)
		.await;

	let config = KeySetCacheConfig::new(format!("{}/jwks", server.uri()));
	let fetcher = Arc::new(
		HttpKeySetFetcher::new(config.source_uri.clone(), config.fetch_timeout).unwrap(),
	);
	let cache = KeySetCache::new(config, fetcher).unwrap();

	assert!(matches!(
		cache.refresh().await.unwrap(),
		RefreshOutcome::Refreshed { keys: 2 }
	));
	for _ in 0..5 {
		assert!(cache.resolve("unknown").is_none());
		assert!(matches!(
			cache.refresh().await.unwrap(),
			RefreshOutcome::RateLimited { .. }
		));
	}
}
