// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret codec configuration section.

use serde::{Deserialize, Serialize};

use crate::secret::SecretString;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodecConfigLayer {
	/// Base64 AES key. Absent means sealed secrets are only base64 framed.
	pub key: Option<SecretString>,
}

impl CodecConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.key.is_some() {
			self.key = other.key;
		}
	}

	pub fn finalize(self) -> CodecConfig {
		CodecConfig {
			key: self.key.filter(|k| !k.expose().trim().is_empty()),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodecConfig {
	pub key: Option<SecretString>,
}

impl CodecConfig {
	pub fn is_keyed(&self) -> bool {
		self.key.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_is_unkeyed() {
		let config = CodecConfigLayer::default().finalize();
		assert!(!config.is_keyed());
	}

	#[test]
	fn test_blank_key_is_unkeyed() {
		let layer = CodecConfigLayer {
			key: Some(SecretString::new("   ")),
		};
		assert!(!layer.finalize().is_keyed());
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = CodecConfigLayer {
			key: Some(SecretString::new("old")),
		};
		base.merge(CodecConfigLayer {
			key: Some(SecretString::new("new")),
		});
		assert_eq!(base.key.as_ref().map(SecretString::expose), Some("new"));
	}

	#[test]
	fn test_merge_preserves_base_when_none() {
		let mut base = CodecConfigLayer {
			key: Some(SecretString::new("old")),
		};
		base.merge(CodecConfigLayer::default());
		assert_eq!(base.key.as_ref().map(SecretString::expose), Some("old"));
	}

	#[test]
	fn test_debug_hides_key() {
		let layer = CodecConfigLayer {
			key: Some(SecretString::new("c2VjcmV0LWtleS1ieXRlcw==")),
		};
		let debug = format!("{:?}", layer.finalize());
		assert!(!debug.contains("c2VjcmV0"));
	}

	#[test]
	fn test_toml_deserialize() {
		let layer: CodecConfigLayer = toml::from_str(r#"key = "abc""#).unwrap();
		assert_eq!(layer.key.as_ref().map(SecretString::expose), Some("abc"));

		let empty: CodecConfigLayer = toml::from_str("").unwrap();
		assert!(empty.key.is_none());
	}
}
