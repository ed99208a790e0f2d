// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! RSA key material and the static keyring.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use thiserror::Error;
use tracing::{debug, instrument};
use webconfig_jwks::KeySet;

use crate::error::{TokenError, TokenResult};

/// Failure to load key material from disk.
#[derive(Debug, Error)]
pub enum KeyLoadError {
	#[error("key file not found: {}", path.display())]
	NotFound { path: PathBuf },

	#[error("failed to read key file {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse key file {}: {source}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: jsonwebtoken::errors::Error,
	},
}

impl KeyLoadError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, KeyLoadError::NotFound { .. })
	}
}

fn read_pem(path: &Path) -> Result<Vec<u8>, KeyLoadError> {
	std::fs::read(path).map_err(|source| {
		if source.kind() == std::io::ErrorKind::NotFound {
			KeyLoadError::NotFound {
				path: path.to_path_buf(),
			}
		} else {
			KeyLoadError::Io {
				path: path.to_path_buf(),
				source,
			}
		}
	})
}

/// Load an RSA private key in PEM form.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_signing_key(path: impl AsRef<Path>) -> Result<EncodingKey, KeyLoadError> {
	let path = path.as_ref();
	let pem = read_pem(path)?;
	EncodingKey::from_rsa_pem(&pem).map_err(|source| KeyLoadError::Parse {
		path: path.to_path_buf(),
		source,
	})
}

/// Load an RSA public key in PEM form.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_verification_key(path: impl AsRef<Path>) -> Result<DecodingKey, KeyLoadError> {
	let path = path.as_ref();
	let pem = read_pem(path)?;
	DecodingKey::from_rsa_pem(&pem).map_err(|source| KeyLoadError::Parse {
		path: path.to_path_buf(),
		source,
	})
}

/// The private key used for issuance, with the kid it is published under.
#[derive(Clone)]
pub struct SigningKey {
	kid: String,
	key: EncodingKey,
}

impl SigningKey {
	pub fn new(kid: impl Into<String>, key: EncodingKey) -> Self {
		Self {
			kid: kid.into(),
			key,
		}
	}

	pub fn from_file(kid: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, KeyLoadError> {
		Ok(Self::new(kid, load_signing_key(path)?))
	}

	pub fn kid(&self) -> &str {
		&self.kid
	}

	pub(crate) fn key(&self) -> &EncodingKey {
		&self.key
	}
}

impl std::fmt::Debug for SigningKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SigningKey")
			.field("kid", &self.kid)
			.field("key", &"[REDACTED]")
			.finish()
	}
}

/// Verification keys loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
	keys: KeySet,
}

impl Keyring {
	pub fn new() -> Self {
		Self::default()
	}

	/// Load a keyring from kid to public key file pairs.
	///
	/// Any file that cannot be loaded fails the whole keyring.
	pub fn from_files<I, K, P>(entries: I) -> TokenResult<Self>
	where
		I: IntoIterator<Item = (K, P)>,
		K: Into<String>,
		P: AsRef<Path>,
	{
		let mut keyring = Self::new();
		for (kid, path) in entries {
			let kid = kid.into();
			let key = load_verification_key(path)?;
			debug!(kid = %kid, "loaded verification key");
			keyring.insert(kid, key);
		}

		if keyring.is_empty() {
			return Err(TokenError::Configuration(
				"keyring has no verification keys".to_string(),
			));
		}
		Ok(keyring)
	}

	pub fn insert(&mut self, kid: impl Into<String>, key: DecodingKey) {
		self.keys.insert(kid, key);
	}

	pub fn get(&self, kid: &str) -> Option<Arc<DecodingKey>> {
		self.keys.get(kid)
	}

	pub fn kids(&self) -> Vec<String> {
		self.keys.kids()
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}
}
