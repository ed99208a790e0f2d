// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for key set fetching and caching.

use std::time::Duration;

use thiserror::Error;

/// Key set errors.
#[derive(Debug, Error)]
pub enum JwksError {
	/// HTTP request failed before a response was received.
	#[error("key set request failed: {0}")]
	Network(#[from] reqwest::Error),

	/// Fetch did not complete within the configured timeout.
	#[error("key set fetch timed out after {0:?}")]
	Timeout(Duration),

	/// Key set endpoint returned a non-success status.
	#[error("key set endpoint returned status {status}")]
	Status { status: u16 },

	/// Document could not be parsed or held no usable keys.
	#[error("invalid key set document: {0}")]
	InvalidDocument(String),

	/// Cache configuration is invalid.
	#[error("invalid key set configuration: {0}")]
	Configuration(String),
}

impl JwksError {
	/// Returns true if a later attempt may succeed without operator action.
	pub fn is_retryable(&self) -> bool {
		match self {
			JwksError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
			JwksError::Timeout(_) => true,
			JwksError::Status { status } => matches!(*status, 408 | 429 | 500 | 502 | 503 | 504),
			JwksError::InvalidDocument(_) | JwksError::Configuration(_) => false,
		}
	}
}

/// Result type alias for key set operations.
pub type JwksResult<T> = std::result::Result<T, JwksError>;
