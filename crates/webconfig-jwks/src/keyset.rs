// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Immutable kid-indexed verification keys.

use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use tracing::warn;

use crate::error::{JwksError, JwksResult};

/// A set of verification keys indexed by key id.
///
/// Once published to a cache a key set is never mutated; refreshes replace
/// it wholesale.
#[derive(Clone, Default)]
pub struct KeySet {
	keys: HashMap<String, Arc<DecodingKey>>,
}

impl KeySet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a key set from a parsed JSON Web Key Set.
	///
	/// Keys without a `kid`, or whose parameters cannot be turned into a
	/// verification key, are skipped. A document with no usable keys is an
	/// error.
	pub fn from_jwk_set(set: &JwkSet) -> JwksResult<Self> {
		let mut keys = HashMap::with_capacity(set.keys.len());
		for jwk in &set.keys {
			let Some(kid) = jwk.common.key_id.as_deref().filter(|k| !k.is_empty()) else {
				warn!("skipping key without kid");
				continue;
			};
			match DecodingKey::from_jwk(jwk) {
				Ok(key) => {
					keys.insert(kid.to_string(), Arc::new(key));
				}
				Err(e) => warn!(kid, error = %e, "skipping unusable key"),
			}
		}

		if keys.is_empty() {
			return Err(JwksError::InvalidDocument(
				"document contains no usable keys".to_string(),
			));
		}
		Ok(Self { keys })
	}

	/// Parse a JSON Web Key Set document.
	pub fn from_json(body: &[u8]) -> JwksResult<Self> {
		let set: JwkSet =
			serde_json::from_slice(body).map_err(|e| JwksError::InvalidDocument(e.to_string()))?;
		Self::from_jwk_set(&set)
	}

	pub fn insert(&mut self, kid: impl Into<String>, key: DecodingKey) {
		self.keys.insert(kid.into(), Arc::new(key));
	}

	pub fn get(&self, kid: &str) -> Option<Arc<DecodingKey>> {
		self.keys.get(kid).cloned()
	}

	pub fn contains(&self, kid: &str) -> bool {
		self.keys.contains_key(kid)
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Key ids in sorted order.
	pub fn kids(&self) -> Vec<String> {
		let mut kids: Vec<String> = self.keys.keys().cloned().collect();
		kids.sort();
		kids
	}
}

impl std::fmt::Debug for KeySet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeySet").field("kids", &self.kids()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const FIXTURE: &str = include_str!("../tests/fixtures/jwks.json");

	#[test]
	fn parses_fixture_document() {
		let set = KeySet::from_json(FIXTURE.as_bytes()).unwrap();
		assert_eq!(set.len(), 2);
		assert_eq!(set.kids(), vec!["rotated_key", "webconfig_key"]);
		assert!(set.get("webconfig_key").is_some());
		assert!(set.get("missing").is_none());
	}

	#[test]
	fn skips_keys_without_kid_or_usable_material() {
		let body = r#"{"keys":[
			{"kty":"RSA","n":"nwEllKzBJnAz2Dh56lrWj7aRkviCKC858NvjL7C40GOu","e":"AQAB"},
			{"kty":"RSA","kid":"broken","n":"!!!not-base64url!!!","e":"AQAB"},
			{"kty":"RSA","kid":"good","n":"nwEllKzBJnAz2Dh56lrWj7aRkviCKC858NvjL7C40GOu","e":"AQAB"}
		]}"#;
		let set = KeySet::from_json(body.as_bytes()).unwrap();
		assert_eq!(set.kids(), vec!["good"]);
	}

	#[test]
	fn empty_document_is_invalid() {
		let err = KeySet::from_json(br#"{"keys":[]}"#).unwrap_err();
		assert!(matches!(err, JwksError::InvalidDocument(_)));
	}

	#[test]
	fn malformed_json_is_invalid() {
		let err = KeySet::from_json(b"<html>").unwrap_err();
		assert!(matches!(err, JwksError::InvalidDocument(_)));
	}

	#[test]
	fn insert_replaces_existing_kid() {
		let mut set = KeySet::new();
		assert!(set.is_empty());
		set.insert("a", DecodingKey::from_secret(b"one"));
		set.insert("a", DecodingKey::from_secret(b"two"));
		assert_eq!(set.len(), 1);
		assert!(set.contains("a"));
	}

	#[test]
	fn debug_lists_kids_only() {
		let mut set = KeySet::new();
		set.insert("k1", DecodingKey::from_secret(b"secret"));
		assert_eq!(format!("{set:?}"), r#"KeySet { kids: ["k1"] }"#);
	}
}
