// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Trust stores: where verification keys come from.

use std::sync::Arc;

use jsonwebtoken::DecodingKey;
use webconfig_jwks::KeySetCache;

use crate::keys::Keyring;

/// Resolves verification keys by kid.
pub trait KeyResolver: Send + Sync {
	fn resolve(&self, kid: &str) -> Option<Arc<DecodingKey>>;

	/// Known kids, for diagnostics.
	fn kids(&self) -> Vec<String>;
}

impl KeyResolver for Keyring {
	fn resolve(&self, kid: &str) -> Option<Arc<DecodingKey>> {
		self.get(kid)
	}

	fn kids(&self) -> Vec<String> {
		Keyring::kids(self)
	}
}

impl KeyResolver for KeySetCache {
	fn resolve(&self, kid: &str) -> Option<Arc<DecodingKey>> {
		KeySetCache::resolve(self, kid)
	}

	fn kids(&self) -> Vec<String> {
		KeySetCache::kids(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keyring_resolves_inserted_keys() {
		let mut keyring = Keyring::new();
		keyring.insert("k1", DecodingKey::from_secret(b"secret"));
		let store: Arc<dyn KeyResolver> = Arc::new(keyring);
		assert!(store.resolve("k1").is_some());
		assert!(store.resolve("k2").is_none());
		assert_eq!(store.kids(), vec!["k1"]);
	}
}
