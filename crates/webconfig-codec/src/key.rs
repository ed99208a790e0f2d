// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Symmetric key material for the codec.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::error::{CodecError, CodecResult};

/// Accepted AES key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySize {
	Aes128,
	Aes192,
	#[default]
	Aes256,
}

impl KeySize {
	/// Length of the key in bytes.
	pub fn byte_len(self) -> usize {
		match self {
			KeySize::Aes128 => 16,
			KeySize::Aes192 => 24,
			KeySize::Aes256 => 32,
		}
	}

	/// Map a byte length back to a key size.
	pub fn from_len(len: usize) -> CodecResult<Self> {
		match len {
			16 => Ok(KeySize::Aes128),
			24 => Ok(KeySize::Aes192),
			32 => Ok(KeySize::Aes256),
			other => Err(CodecError::InvalidKeySize(other)),
		}
	}
}

/// Raw AES key bytes, zeroized on drop.
#[derive(Clone)]
pub struct SymmetricKey {
	bytes: Zeroizing<Vec<u8>>,
	size: KeySize,
}

impl SymmetricKey {
	/// Wrap raw key bytes. Only 16, 24 and 32 byte keys are accepted.
	pub fn new(bytes: impl Into<Vec<u8>>) -> CodecResult<Self> {
		let bytes = Zeroizing::new(bytes.into());
		let size = KeySize::from_len(bytes.len())?;
		Ok(Self { bytes, size })
	}

	/// Decode a standard base64 key as produced by [`generate_key_base64`].
	pub fn from_base64(encoded: &str) -> CodecResult<Self> {
		let bytes = Zeroizing::new(
			BASE64
				.decode(encoded.trim().as_bytes())
				.map_err(|e| CodecError::InvalidKeyEncoding(e.to_string()))?,
		);
		Self::new(bytes.to_vec())
	}

	/// Generate a fresh random key.
	pub fn generate(size: KeySize) -> Self {
		let mut bytes = Zeroizing::new(vec![0u8; size.byte_len()]);
		OsRng.fill_bytes(bytes.as_mut_slice());
		Self { bytes, size }
	}

	pub fn size(&self) -> KeySize {
		self.size
	}

	pub(crate) fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}
}

impl std::fmt::Debug for SymmetricKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SymmetricKey")
			.field("bytes", &"[REDACTED]")
			.field("size", &self.size)
			.finish()
	}
}

/// Generate a random AES-256 key encoded as standard base64.
///
/// Used to provision codec instances out-of-band.
pub fn generate_key_base64() -> String {
	generate_key_base64_with_size(KeySize::default())
}

/// Generate a random key of the given size encoded as standard base64.
pub fn generate_key_base64_with_size(size: KeySize) -> String {
	let key = SymmetricKey::generate(size);
	BASE64.encode(key.as_bytes())
}
