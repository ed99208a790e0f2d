// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared key set with periodic and on-demand refresh.
//!
//! Readers take a snapshot of the current [`KeySet`] without waiting on
//! network I/O. A background task refreshes the set on a fixed interval and
//! out of cycle when a lookup misses. A failed refresh never clears the keys
//! already held.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::KeySetCacheConfig;
use crate::error::{JwksError, JwksResult};
use crate::fetch::{HttpKeySetFetcher, KeySetFetcher};
use crate::keyset::KeySet;

/// Sink for refresh failures, invoked after the failure is logged.
pub type RefreshErrorHandler = Arc<dyn Fn(&JwksError) + Send + Sync>;

/// What a call to [`KeySetCache::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// A new key set was fetched and published.
	Refreshed { keys: usize },
	/// The last attempt was too recent.
	RateLimited { retry_in: Duration },
	/// Another refresh was already running.
	InFlight,
}

/// Handle to the background refresh loop.
#[derive(Debug)]
pub struct RefreshTask {
	handle: JoinHandle<()>,
}

impl RefreshTask {
	/// Stop the loop. Keys already cached stay readable.
	pub fn cancel(&self) {
		self.handle.abort();
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}
}

/// Cache of remotely published verification keys.
#[derive(Clone)]
pub struct KeySetCache {
	inner: Arc<KeySetCacheInner>,
	on_error: Option<RefreshErrorHandler>,
}

struct KeySetCacheInner {
	config: KeySetCacheConfig,
	fetcher: Arc<dyn KeySetFetcher>,
	keys: RwLock<Arc<KeySet>>,
	last_attempt: Mutex<Option<Instant>>,
	last_refreshed: RwLock<Option<DateTime<Utc>>>,
	/// Held for the duration of a fetch.
	refreshing: tokio::sync::Mutex<()>,
	wake: Notify,
}

impl KeySetCache {
	/// Create an empty cache. Nothing is fetched until [`refresh`](Self::refresh)
	/// or [`spawn_refresh`](Self::spawn_refresh) is called.
	pub fn new(config: KeySetCacheConfig, fetcher: Arc<dyn KeySetFetcher>) -> JwksResult<Self> {
		config.validate()?;
		Ok(Self {
			inner: Arc::new(KeySetCacheInner {
				config,
				fetcher,
				keys: RwLock::new(Arc::new(KeySet::new())),
				last_attempt: Mutex::new(None),
				last_refreshed: RwLock::new(None),
				refreshing: tokio::sync::Mutex::new(()),
				wake: Notify::new(),
			}),
			on_error: None,
		})
	}

	pub fn with_error_handler(mut self, handler: RefreshErrorHandler) -> Self {
		self.on_error = Some(handler);
		self
	}

	/// Build an HTTP-backed cache, fetch once and start the refresh loop.
	///
	/// A failed initial fetch is reported through the error handler and the
	/// loop retries on schedule; only invalid configuration is fatal.
	pub async fn start(
		config: KeySetCacheConfig,
		on_error: Option<RefreshErrorHandler>,
	) -> JwksResult<(Self, RefreshTask)> {
		config.validate()?;
		let fetcher = HttpKeySetFetcher::new(config.source_uri.clone(), config.fetch_timeout)?;
		let mut cache = Self::new(config, Arc::new(fetcher))?;
		if let Some(handler) = on_error {
			cache = cache.with_error_handler(handler);
		}

		if cache.refresh().await.is_err() {
			warn!(
				source = cache.inner.fetcher.source(),
				"initial key set fetch failed, starting with an empty key set"
			);
		}

		let task = cache.spawn_refresh();
		Ok((cache, task))
	}

	pub fn config(&self) -> &KeySetCacheConfig {
		&self.inner.config
	}

	/// Fetch and publish a new key set.
	///
	/// Concurrent callers collapse onto one fetch, and attempts closer together
	/// than `min_refresh_interval` are skipped. On failure the previous keys
	/// are kept and the error is returned.
	pub async fn refresh(&self) -> JwksResult<RefreshOutcome> {
		let Ok(_guard) = self.inner.refreshing.try_lock() else {
			debug!("key set refresh already in flight");
			return Ok(RefreshOutcome::InFlight);
		};

		if let Some(retry_in) = self.rate_limit_remaining() {
			debug!(retry_in_ms = retry_in.as_millis() as u64, "key set refresh rate limited");
			return Ok(RefreshOutcome::RateLimited { retry_in });
		}
		*self.inner.last_attempt.lock() = Some(Instant::now());

		let timeout = self.inner.config.fetch_timeout;
		let result = match tokio::time::timeout(timeout, self.inner.fetcher.fetch()).await {
			Ok(Ok(keys)) if keys.is_empty() => Err(JwksError::InvalidDocument(
				"key set contains no keys".to_string(),
			)),
			Ok(result) => result,
			Err(_) => Err(JwksError::Timeout(timeout)),
		};

		match result {
			Ok(keys) => {
				let count = keys.len();
				let kids = keys.kids();
				*self.inner.keys.write() = Arc::new(keys);
				*self.inner.last_refreshed.write() = Some(Utc::now());
				info!(
					source = self.inner.fetcher.source(),
					keys = count,
					kids = ?kids,
					"key set refreshed"
				);
				Ok(RefreshOutcome::Refreshed { keys: count })
			}
			Err(e) => {
				warn!(
					source = self.inner.fetcher.source(),
					error = %e,
					retryable = e.is_retryable(),
					"key set refresh failed, keeping previous keys"
				);
				if let Some(handler) = &self.on_error {
					handler(&e);
				}
				Err(e)
			}
		}
	}

	/// Start the background refresh loop.
	pub fn spawn_refresh(&self) -> RefreshTask {
		let cache = self.clone();
		let handle = tokio::spawn(async move { cache.run().await });
		RefreshTask { handle }
	}

	async fn run(&self) {
		info!(
			source = self.inner.fetcher.source(),
			refresh_interval_secs = self.inner.config.refresh_interval.as_secs(),
			"starting key set refresh loop"
		);

		loop {
			tokio::select! {
				_ = tokio::time::sleep(self.inner.config.refresh_interval) => {}
				_ = self.inner.wake.notified() => {
					if let Some(wait) = self.rate_limit_remaining() {
						tokio::time::sleep(wait).await;
					}
				}
			}

			// Failures are already logged and reported by refresh.
			if let Ok(outcome) = self.refresh().await {
				debug!(?outcome, "key set refresh cycle complete");
			}
		}
	}

	/// Look up a key by id.
	///
	/// A miss asks the refresh loop for an out-of-cycle refresh; the caller
	/// still gets `None` for this lookup.
	pub fn resolve(&self, kid: &str) -> Option<Arc<DecodingKey>> {
		let key = self.snapshot().get(kid);
		if key.is_none() {
			debug!(kid, "kid not in key set, requesting refresh");
			self.inner.wake.notify_one();
		}
		key
	}

	/// The currently published key set.
	pub fn snapshot(&self) -> Arc<KeySet> {
		Arc::clone(&self.inner.keys.read())
	}

	pub fn kids(&self) -> Vec<String> {
		self.snapshot().kids()
	}

	/// When keys were last published successfully.
	pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
		*self.inner.last_refreshed.read()
	}

	fn rate_limit_remaining(&self) -> Option<Duration> {
		let last = (*self.inner.last_attempt.lock())?;
		let remaining = self
			.inner
			.config
			.min_refresh_interval
			.saturating_sub(last.elapsed());
		(!remaining.is_zero()).then_some(remaining)
	}
}

impl std::fmt::Debug for KeySetCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeySetCache")
			.field("source", &self.inner.fetcher.source())
			.field("kids", &self.kids())
			.field("last_refreshed", &self.last_refreshed())
			.finish()
	}
}
