// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Device bearer tokens.
//!
//! A [`TokenAuthority`] issues RS256 tokens under one designated signing key
//! and verifies tokens against a kid-indexed trust store. The trust store is
//! either a [`Keyring`] loaded from PEM files at startup or a
//! [`webconfig_jwks::KeySetCache`] kept fresh from a remote key set.
//!
//! Verification is split into policy checks owned by the authority (kid
//! allow-list, capabilities, device binding) and a pluggable
//! [`ClaimsVerifier`] that checks the signature and temporal claims.

mod authority;
mod claims;
mod error;
mod jwt;
mod keys;
mod trust;
mod verifier;

pub use authority::{
	IssuanceProfile, IssueRequest, TokenAuthority, TokenAuthorityBuilder, TokenClass,
	TokenClassPolicy, DEFAULT_SIGNING_KID,
};
pub use claims::{Audience, TokenClaims};
pub use error::{ErrorCategory, TokenError, TokenResult};
pub use jwt::parse_kid;
pub use keys::{load_signing_key, load_verification_key, KeyLoadError, Keyring, SigningKey};
pub use trust::KeyResolver;
pub use verifier::{
	ClaimsVerifier, CurrentVerifier, LegacyVerifier, VerifierKind, CURRENT_LEEWAY_SECS,
	LEGACY_LEEWAY_SECS,
};
