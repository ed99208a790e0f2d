// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use crate::error::{JwksError, JwksResult};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`KeySetCache`](crate::KeySetCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySetCacheConfig {
	/// Location of the JSON Web Key Set document.
	pub source_uri: String,
	/// Period of the background refresh.
	pub refresh_interval: Duration,
	/// Minimum time between two fetch attempts.
	pub min_refresh_interval: Duration,
	/// Bound on a single fetch.
	pub fetch_timeout: Duration,
}

impl KeySetCacheConfig {
	/// Config for `source_uri` with default intervals.
	pub fn new(source_uri: impl Into<String>) -> Self {
		Self {
			source_uri: source_uri.into(),
			refresh_interval: DEFAULT_REFRESH_INTERVAL,
			min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
			fetch_timeout: DEFAULT_FETCH_TIMEOUT,
		}
	}

	pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
		self.refresh_interval = interval;
		self
	}

	pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
		self.min_refresh_interval = interval;
		self
	}

	pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
		self.fetch_timeout = timeout;
		self
	}

	pub fn validate(&self) -> JwksResult<()> {
		if self.source_uri.trim().is_empty() {
			return Err(JwksError::Configuration("source uri is empty".to_string()));
		}
		if self.refresh_interval.is_zero() {
			return Err(JwksError::Configuration(
				"refresh interval must be non-zero".to_string(),
			));
		}
		if self.fetch_timeout.is_zero() {
			return Err(JwksError::Configuration(
				"fetch timeout must be non-zero".to_string(),
			));
		}
		if self.min_refresh_interval > self.refresh_interval {
			return Err(JwksError::Configuration(format!(
				"min refresh interval {:?} exceeds refresh interval {:?}",
				self.min_refresh_interval, self.refresh_interval
			)));
		}
		Ok(())
	}
}
