// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the sealed-secret codec.

use thiserror::Error;

/// Result type alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while sealing or opening secrets.
#[derive(Debug, Error)]
pub enum CodecError {
	// =========================================================================
	// Configuration Errors
	// =========================================================================
	#[error("invalid key size: expected 16, 24 or 32 bytes, got {0}")]
	InvalidKeySize(usize),

	#[error("invalid key encoding: {0}")]
	InvalidKeyEncoding(String),

	// =========================================================================
	// Structural Errors
	// =========================================================================
	#[error("invalid base64: {0}")]
	InvalidEncoding(#[from] base64::DecodeError),

	#[error("sealed secret too short: {0} bytes")]
	TooShort(usize),

	#[error("ciphertext length {0} is not a multiple of the block size")]
	NotBlockAligned(usize),

	#[error("residual length {0} is shorter than the digest")]
	ResidualTooShort(usize),

	#[error("digest mismatch")]
	DigestMismatch,

	#[error("decrypted secret is not valid UTF-8")]
	InvalidUtf8(#[from] std::string::FromUtf8Error),

	// =========================================================================
	// Input Errors
	// =========================================================================
	#[error("plaintext ends with padding byte 0x{0:02x} and cannot round-trip")]
	AmbiguousTrailingByte(u8),

	// =========================================================================
	// Internal Errors
	// =========================================================================
	#[error("cipher error: {0}")]
	Cipher(String),
}

impl CodecError {
	/// Returns true if the input was a malformed sealed secret.
	pub fn is_structural(&self) -> bool {
		matches!(
			self,
			CodecError::InvalidEncoding(_)
				| CodecError::TooShort(_)
				| CodecError::NotBlockAligned(_)
				| CodecError::ResidualTooShort(_)
				| CodecError::DigestMismatch
				| CodecError::InvalidUtf8(_)
		)
	}

	/// Returns true if the codec itself was misconfigured.
	pub fn is_configuration(&self) -> bool {
		matches!(
			self,
			CodecError::InvalidKeySize(_) | CodecError::InvalidKeyEncoding(_)
		)
	}
}
