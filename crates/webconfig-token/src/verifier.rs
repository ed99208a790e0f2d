// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signature and temporal-claim verification strategies.
//!
//! Two token generations are in circulation. [`CurrentVerifier`] enforces the
//! format issued today; [`LegacyVerifier`] accepts tokens from older issuers
//! that used other RSA digests and omitted temporal claims.

use std::str::FromStr;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::claims::TokenClaims;
use crate::error::{TokenError, TokenResult};

/// Clock skew tolerated by the current verifier, in seconds.
pub const CURRENT_LEEWAY_SECS: u64 = 30;

/// Clock skew tolerated by the legacy verifier, in seconds.
pub const LEGACY_LEEWAY_SECS: u64 = 300;

/// Verifies a token's signature and temporal claims against a resolved key.
pub trait ClaimsVerifier: Send + Sync + std::fmt::Debug {
	fn verify(&self, token: &str, key: &DecodingKey) -> TokenResult<TokenClaims>;

	fn name(&self) -> &'static str;
}

fn decode(token: &str, key: &DecodingKey, validation: &Validation) -> TokenResult<TokenClaims> {
	jsonwebtoken::decode::<TokenClaims>(token, key, validation)
		.map(|data| data.claims)
		.map_err(TokenError::InvalidSignature)
}

/// Strict verification of tokens in the current format.
#[derive(Debug, Clone)]
pub struct CurrentVerifier {
	validation: Validation,
}

impl CurrentVerifier {
	/// `audience`, when set, must appear in the token's `aud` claim.
	pub fn new(audience: Option<&str>) -> Self {
		let mut validation = Validation::new(Algorithm::RS256);
		validation.leeway = CURRENT_LEEWAY_SECS;
		validation.validate_exp = true;
		validation.validate_nbf = true;
		validation.set_required_spec_claims(&["exp"]);
		match audience {
			Some(aud) => validation.set_audience(&[aud]),
			None => validation.validate_aud = false,
		}
		Self { validation }
	}
}

impl Default for CurrentVerifier {
	fn default() -> Self {
		Self::new(None)
	}
}

impl ClaimsVerifier for CurrentVerifier {
	fn verify(&self, token: &str, key: &DecodingKey) -> TokenResult<TokenClaims> {
		decode(token, key, &self.validation)
	}

	fn name(&self) -> &'static str {
		"current"
	}
}

/// Lenient verification for tokens minted by older issuers.
#[derive(Debug, Clone)]
pub struct LegacyVerifier {
	validation: Validation,
}

impl LegacyVerifier {
	pub fn new() -> Self {
		let mut validation = Validation::new(Algorithm::RS256);
		validation.algorithms = vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];
		validation.leeway = LEGACY_LEEWAY_SECS;
		validation.validate_exp = true;
		validation.validate_nbf = false;
		validation.validate_aud = false;
		validation.set_required_spec_claims::<&str>(&[]);
		Self { validation }
	}
}

impl Default for LegacyVerifier {
	fn default() -> Self {
		Self::new()
	}
}

impl ClaimsVerifier for LegacyVerifier {
	fn verify(&self, token: &str, key: &DecodingKey) -> TokenResult<TokenClaims> {
		decode(token, key, &self.validation)
	}

	fn name(&self) -> &'static str {
		"legacy"
	}
}

/// Which built-in verifier a [`TokenAuthority`](crate::TokenAuthority) uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerifierKind {
	#[default]
	Current,
	Legacy,
}

impl VerifierKind {
	pub fn build(self, audience: Option<&str>) -> Arc<dyn ClaimsVerifier> {
		match self {
			VerifierKind::Current => Arc::new(CurrentVerifier::new(audience)),
			VerifierKind::Legacy => Arc::new(LegacyVerifier::new()),
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			VerifierKind::Current => "current",
			VerifierKind::Legacy => "legacy",
		}
	}
}

impl FromStr for VerifierKind {
	type Err = TokenError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"current" => Ok(VerifierKind::Current),
			"legacy" => Ok(VerifierKind::Legacy),
			other => Err(TokenError::Configuration(format!(
				"unknown verifier '{other}', expected 'current' or 'legacy'"
			))),
		}
	}
}

impl std::fmt::Display for VerifierKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
