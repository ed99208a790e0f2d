// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for token issuance and verification.

use thiserror::Error;

use crate::keys::KeyLoadError;

/// Broad class of a [`TokenError`], for callers that alert differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
	/// The authority itself is misconfigured.
	Configuration,
	/// The token is not a well-formed signed token.
	Structural,
	/// The token is well-formed but must not be accepted.
	Authorization,
}

impl std::fmt::Display for ErrorCategory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCategory::Configuration => write!(f, "configuration"),
			ErrorCategory::Structural => write!(f, "structural"),
			ErrorCategory::Authorization => write!(f, "authorization"),
		}
	}
}

/// Token errors.
#[derive(Debug, Error)]
pub enum TokenError {
	// =========================================================================
	// Configuration Errors
	// =========================================================================
	#[error("token authority misconfigured: {0}")]
	Configuration(String),

	#[error(transparent)]
	KeyLoad(#[from] KeyLoadError),

	#[error("failed to sign token: {0}")]
	Signing(#[source] jsonwebtoken::errors::Error),

	// =========================================================================
	// Structural Errors
	// =========================================================================
	#[error("malformed token: {0}")]
	Malformed(String),

	#[error("token header has no kid")]
	MissingKid,

	// =========================================================================
	// Authorization Errors
	// =========================================================================
	#[error("kid {kid} is not allowed for this token class")]
	KidNotAllowed { kid: String },

	#[error("token lacks every required capability")]
	InsufficientCapabilities,

	#[error("token binding does not match")]
	BindingMismatch,

	#[error("no verification key for kid {kid}")]
	UnknownKey { kid: String },

	#[error("invalid signature or expired token: {0}")]
	InvalidSignature(#[source] jsonwebtoken::errors::Error),
}

impl TokenError {
	pub fn category(&self) -> ErrorCategory {
		match self {
			TokenError::Configuration(_) | TokenError::KeyLoad(_) | TokenError::Signing(_) => {
				ErrorCategory::Configuration
			}
			TokenError::Malformed(_) | TokenError::MissingKid => ErrorCategory::Structural,
			TokenError::KidNotAllowed { .. }
			| TokenError::InsufficientCapabilities
			| TokenError::BindingMismatch
			| TokenError::UnknownKey { .. }
			| TokenError::InvalidSignature(_) => ErrorCategory::Authorization,
		}
	}

	pub fn is_structural(&self) -> bool {
		self.category() == ErrorCategory::Structural
	}

	pub fn is_authorization(&self) -> bool {
		self.category() == ErrorCategory::Authorization
	}

	/// Returns true if signature verification failed because the token expired.
	pub fn is_expired(&self) -> bool {
		matches!(
			self,
			TokenError::InvalidSignature(e)
				if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature)
		)
	}
}

/// Result type alias for token operations.
pub type TokenResult<T> = std::result::Result<T, TokenError>;

#[cfg(test)]
mod tests {
	use super::*;
	use jsonwebtoken::errors::{Error as JwtError, ErrorKind};

	#[test]
	fn structural_errors() {
		assert!(TokenError::Malformed("two segments".into()).is_structural());
		assert!(TokenError::MissingKid.is_structural());
		assert!(!TokenError::MissingKid.is_authorization());
	}

	#[test]
	fn authorization_errors() {
		let errors = [
			TokenError::KidNotAllowed { kid: "k".into() },
			TokenError::InsufficientCapabilities,
			TokenError::BindingMismatch,
			TokenError::UnknownKey { kid: "k".into() },
			TokenError::InvalidSignature(JwtError::from(ErrorKind::InvalidSignature)),
		];
		for err in errors {
			assert_eq!(err.category(), ErrorCategory::Authorization, "{err}");
		}
	}

	#[test]
	fn expiry_is_distinguishable() {
		let expired = TokenError::InvalidSignature(JwtError::from(ErrorKind::ExpiredSignature));
		assert!(expired.is_expired());
		let forged = TokenError::InvalidSignature(JwtError::from(ErrorKind::InvalidSignature));
		assert!(!forged.is_expired());
	}

	#[test]
	fn category_display() {
		assert_eq!(ErrorCategory::Authorization.to_string(), "authorization");
		assert_eq!(
			TokenError::Configuration("x".into()).category().to_string(),
			"configuration"
		);
	}
}
