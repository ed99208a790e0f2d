// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sealing and opening of secrets.
//!
//! A sealed secret is `base64(iv || AES-CBC(digest || plaintext || padding))`.
//! Without a configured key the codec degrades to plain base64.

use aes::cipher::{
	block_padding::NoPadding, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};
use zeroize::Zeroizing;

use crate::error::{CodecError, CodecResult};
use crate::framing::{self, BLOCK_SIZE, DIGEST_SIZE, IV_SIZE};
use crate::key::{KeySize, SymmetricKey};

/// Upper bound on fresh-IV retries for an empty plaintext.
const MAX_EMPTY_ATTEMPTS: usize = 16;

/// Seals and opens secrets with a symmetric key, or passes them through as
/// base64 when no key is configured.
#[derive(Clone)]
pub struct SecretCodec {
	key: Option<SymmetricKey>,
}

impl SecretCodec {
	/// Build a keyed codec.
	pub fn new(key: SymmetricKey) -> Self {
		Self { key: Some(key) }
	}

	/// Build a codec that only base64-encodes.
	pub fn passthrough() -> Self {
		warn!("secret codec has no key configured, secrets will be stored as plain base64");
		Self { key: None }
	}

	/// Build a codec from an optional base64 key. `None` or a blank string
	/// selects passthrough mode.
	pub fn from_base64_key(key: Option<&str>) -> CodecResult<Self> {
		match key.map(str::trim).filter(|k| !k.is_empty()) {
			Some(encoded) => Ok(Self::new(SymmetricKey::from_base64(encoded)?)),
			None => Ok(Self::passthrough()),
		}
	}

	pub fn has_key(&self) -> bool {
		self.key.is_some()
	}

	/// Size of the configured key, if any.
	pub fn key_size(&self) -> Option<KeySize> {
		self.key.as_ref().map(SymmetricKey::size)
	}

	/// Seal a UTF-8 secret into its base64 text form.
	#[instrument(skip(self, plaintext), fields(keyed = self.has_key()))]
	pub fn encrypt(&self, plaintext: &str) -> CodecResult<String> {
		let sealed = self.encrypt_bytes(plaintext.as_bytes())?;
		Ok(BASE64.encode(sealed))
	}

	/// Open a base64 sealed secret back into UTF-8 text.
	#[instrument(skip(self, sealed), fields(keyed = self.has_key()))]
	pub fn decrypt(&self, sealed: &str) -> CodecResult<String> {
		let raw = BASE64.decode(sealed.trim().as_bytes())?;
		let plaintext = self.decrypt_bytes(&raw)?;
		Ok(String::from_utf8(plaintext)?)
	}

	/// Seal raw bytes, returning `iv || ciphertext`.
	///
	/// In passthrough mode the input is returned unchanged.
	pub fn encrypt_bytes(&self, plaintext: &[u8]) -> CodecResult<Vec<u8>> {
		let Some(key) = &self.key else {
			return Ok(plaintext.to_vec());
		};

		if let Some(&last) = plaintext.last() {
			if framing::is_padding_byte(last) {
				return Err(CodecError::AmbiguousTrailingByte(last));
			}
			return seal(key, &random_iv(), plaintext);
		}

		// The body of an empty plaintext is the bare digest, so its final
		// byte must survive unpadding too.
		for _ in 0..MAX_EMPTY_ATTEMPTS {
			let iv = random_iv();
			let digest = framing::digest(&iv, plaintext);
			if !framing::is_padding_byte(digest[DIGEST_SIZE - 1]) {
				return seal(key, &iv, plaintext);
			}
			debug!("digest of empty plaintext ends in a padding byte, drawing a new iv");
		}
		Err(CodecError::AmbiguousTrailingByte(0))
	}

	/// Open `iv || ciphertext` bytes.
	///
	/// In passthrough mode the input is returned unchanged.
	pub fn decrypt_bytes(&self, sealed: &[u8]) -> CodecResult<Vec<u8>> {
		let Some(key) = &self.key else {
			return Ok(sealed.to_vec());
		};

		if sealed.len() < IV_SIZE + BLOCK_SIZE {
			return Err(CodecError::TooShort(sealed.len()));
		}
		let (iv, ciphertext) = sealed.split_at(IV_SIZE);
		if ciphertext.len() % BLOCK_SIZE != 0 {
			return Err(CodecError::NotBlockAligned(ciphertext.len()));
		}

		let mut buf = Zeroizing::new(ciphertext.to_vec());
		cbc_decrypt(key, iv, &mut buf)?;

		let residual = framing::unpad(&buf);
		if residual.len() < DIGEST_SIZE {
			return Err(CodecError::ResidualTooShort(residual.len()));
		}
		let (digest, plaintext) = residual.split_at(DIGEST_SIZE);

		let expected = framing::digest(iv, plaintext);
		if !bool::from(expected.ct_eq(digest)) {
			if let Some(byte) = framing::stripped_trailing_byte(iv, &buf, residual.len()) {
				debug!(byte, "sealed plaintext ends in a padding byte");
				return Err(CodecError::AmbiguousTrailingByte(byte));
			}
			return Err(CodecError::DigestMismatch);
		}
		Ok(plaintext.to_vec())
	}
}

impl std::fmt::Debug for SecretCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SecretCodec")
			.field("key", &self.key_size().map(|_| "[REDACTED]"))
			.finish()
	}
}

fn random_iv() -> [u8; IV_SIZE] {
	let mut iv = [0u8; IV_SIZE];
	OsRng.fill_bytes(&mut iv);
	iv
}

fn seal(key: &SymmetricKey, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> CodecResult<Vec<u8>> {
	let mut body = framing::frame(iv, plaintext);
	framing::pad(&mut body);
	cbc_encrypt(key, iv, &mut body)?;

	let mut out = Vec::with_capacity(IV_SIZE + body.len());
	out.extend_from_slice(iv);
	out.extend_from_slice(&body);
	Ok(out)
}

fn cbc_encrypt(key: &SymmetricKey, iv: &[u8], buf: &mut [u8]) -> CodecResult<()> {
	match key.size() {
		KeySize::Aes128 => encrypt_with::<aes::Aes128>(key.as_bytes(), iv, buf),
		KeySize::Aes192 => encrypt_with::<aes::Aes192>(key.as_bytes(), iv, buf),
		KeySize::Aes256 => encrypt_with::<aes::Aes256>(key.as_bytes(), iv, buf),
	}
}

fn cbc_decrypt(key: &SymmetricKey, iv: &[u8], buf: &mut [u8]) -> CodecResult<()> {
	match key.size() {
		KeySize::Aes128 => decrypt_with::<aes::Aes128>(key.as_bytes(), iv, buf),
		KeySize::Aes192 => decrypt_with::<aes::Aes192>(key.as_bytes(), iv, buf),
		KeySize::Aes256 => decrypt_with::<aes::Aes256>(key.as_bytes(), iv, buf),
	}
}

fn encrypt_with<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> CodecResult<()>
where
	C: BlockEncryptMut + BlockCipher + KeyInit,
{
	let len = buf.len();
	cbc::Encryptor::<C>::new_from_slices(key, iv)
		.map_err(|e| CodecError::Cipher(format!("cipher init failed: {e}")))?
		.encrypt_padded_mut::<NoPadding>(buf, len)
		.map_err(|e| CodecError::Cipher(format!("encryption failed: {e:?}")))?;
	Ok(())
}

fn decrypt_with<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> CodecResult<()>
where
	C: BlockDecryptMut + BlockCipher + KeyInit,
{
	cbc::Decryptor::<C>::new_from_slices(key, iv)
		.map_err(|e| CodecError::Cipher(format!("cipher init failed: {e}")))?
		.decrypt_padded_mut::<NoPadding>(buf)
		.map_err(|e| CodecError::Cipher(format!("decryption failed: {e:?}")))?;
	Ok(())
}
