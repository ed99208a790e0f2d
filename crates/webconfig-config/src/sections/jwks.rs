// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote key set configuration section.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 15 * 60;
pub const DEFAULT_MIN_REFRESH_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JwksConfigLayer {
	pub uri: Option<String>,
	pub refresh_interval_secs: Option<u64>,
	pub min_refresh_interval_secs: Option<u64>,
	pub timeout_secs: Option<u64>,
}

impl JwksConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.uri.is_some() {
			self.uri = other.uri;
		}
		if other.refresh_interval_secs.is_some() {
			self.refresh_interval_secs = other.refresh_interval_secs;
		}
		if other.min_refresh_interval_secs.is_some() {
			self.min_refresh_interval_secs = other.min_refresh_interval_secs;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	/// Returns `None` when no URI is configured.
	pub fn finalize(self) -> Result<Option<JwksConfig>, ConfigError> {
		let Some(uri) = self.uri.filter(|u| !u.trim().is_empty()) else {
			return Ok(None);
		};

		let config = JwksConfig {
			uri,
			refresh_interval_secs: self
				.refresh_interval_secs
				.unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
			min_refresh_interval_secs: self
				.min_refresh_interval_secs
				.unwrap_or(DEFAULT_MIN_REFRESH_INTERVAL_SECS),
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
		};

		for (key, value) in [
			("jwks.refresh_interval_secs", config.refresh_interval_secs),
			("jwks.min_refresh_interval_secs", config.min_refresh_interval_secs),
			("jwks.timeout_secs", config.timeout_secs),
		] {
			if value == 0 {
				return Err(ConfigError::InvalidValue {
					key: key.to_string(),
					message: "must be greater than zero".to_string(),
				});
			}
		}
		if config.min_refresh_interval_secs > config.refresh_interval_secs {
			return Err(ConfigError::Validation(format!(
				"jwks.min_refresh_interval_secs ({}) exceeds jwks.refresh_interval_secs ({})",
				config.min_refresh_interval_secs, config.refresh_interval_secs
			)));
		}

		Ok(Some(config))
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JwksConfig {
	pub uri: String,
	pub refresh_interval_secs: u64,
	pub min_refresh_interval_secs: u64,
	pub timeout_secs: u64,
}
