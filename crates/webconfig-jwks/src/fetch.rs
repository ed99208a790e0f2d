// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key set retrieval.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::{JwksError, JwksResult};
use crate::keyset::KeySet;

/// Source of key sets for a [`KeySetCache`](crate::KeySetCache).
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
	/// Fetch and parse the current key set.
	async fn fetch(&self) -> JwksResult<KeySet>;

	/// Human readable description of where keys come from, for logs.
	fn source(&self) -> &str {
		"custom"
	}
}

/// User-Agent sent with key set requests.
pub fn user_agent() -> String {
	format!("webconfig-jwks/{}", env!("CARGO_PKG_VERSION"))
}

/// Fetches a JSON Web Key Set document over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
	client: Client,
	uri: String,
}

impl HttpKeySetFetcher {
	pub fn new(uri: impl Into<String>, timeout: Duration) -> JwksResult<Self> {
		let client = Client::builder()
			.user_agent(user_agent())
			.timeout(timeout)
			.build()?;
		Ok(Self::with_client(client, uri))
	}

	/// Use a preconfigured client.
	pub fn with_client(client: Client, uri: impl Into<String>) -> Self {
		Self {
			client,
			uri: uri.into(),
		}
	}

	pub fn uri(&self) -> &str {
		&self.uri
	}
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
	#[instrument(skip(self), fields(uri = %self.uri))]
	async fn fetch(&self) -> JwksResult<KeySet> {
		let response = self
			.client
			.get(&self.uri)
			.header(ACCEPT, "application/json")
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(JwksError::Status {
				status: status.as_u16(),
			});
		}

		let body = response.bytes().await?;
		let keys = KeySet::from_json(&body)?;
		debug!(keys = keys.len(), "fetched key set");
		Ok(keys)
	}

	fn source(&self) -> &str {
		&self.uri
	}
}
