// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote JSON Web Key Set cache.
//!
//! [`KeySetCache`] holds the verification keys published at a JWKS endpoint
//! and keeps them current with a background refresh loop. Lookups never wait
//! on the network; an unknown kid schedules an out-of-cycle refresh, bounded by
//! a minimum interval between fetch attempts.
//!
//! ```no_run
//! # async fn example() -> webconfig_jwks::JwksResult<()> {
//! use webconfig_jwks::{KeySetCache, KeySetCacheConfig};
//!
//! let config = KeySetCacheConfig::new("https://keys.example.com/.well-known/jwks.json");
//! let (cache, task) = KeySetCache::start(config, None).await?;
//! let key = cache.resolve("webconfig_key");
//! task.cancel();
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod error;
mod fetch;
mod keyset;

pub use cache::{KeySetCache, RefreshErrorHandler, RefreshOutcome, RefreshTask};
pub use config::{
	KeySetCacheConfig, DEFAULT_FETCH_TIMEOUT, DEFAULT_MIN_REFRESH_INTERVAL, DEFAULT_REFRESH_INTERVAL,
};
pub use error::{JwksError, JwksResult};
pub use fetch::{user_agent, HttpKeySetFetcher, KeySetFetcher};
pub use keyset::KeySet;
