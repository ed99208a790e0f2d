// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token issuance and verification.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, Header};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;
use webconfig_jwks::KeySetCache;

use crate::claims::{Audience, TokenClaims};
use crate::error::{TokenError, TokenResult};
use crate::jwt::{decode_claims_unverified, parse_kid};
use crate::keys::{Keyring, SigningKey};
use crate::trust::KeyResolver;
use crate::verifier::{ClaimsVerifier, VerifierKind};

/// Kid of the key tokens are issued under unless configured otherwise.
pub const DEFAULT_SIGNING_KID: &str = "webconfig_key";

/// The two independently configured classes of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
	Api,
	Device,
}

impl std::fmt::Display for TokenClass {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TokenClass::Api => f.write_str("api"),
			TokenClass::Device => f.write_str("device"),
		}
	}
}

/// Which kids and capabilities a token class accepts.
///
/// An empty `allowed_kids` accepts no token at all. An empty
/// `required_capabilities` skips the capability check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenClassPolicy {
	pub allowed_kids: Vec<String>,
	pub required_capabilities: Vec<String>,
}

impl TokenClassPolicy {
	pub fn new<I, S>(allowed_kids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			allowed_kids: allowed_kids.into_iter().map(Into::into).collect(),
			required_capabilities: Vec::new(),
		}
	}

	pub fn with_required_capabilities<I, S>(mut self, capabilities: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.required_capabilities = capabilities.into_iter().map(Into::into).collect();
		self
	}

	pub fn allows_kid(&self, kid: &str) -> bool {
		self.allowed_kids.iter().any(|k| k == kid)
	}
}

/// Fixed claim values stamped on every issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceProfile {
	pub issuer: String,
	pub audience: String,
	pub subject: String,
	pub partner_id: String,
	pub trust: String,
	pub capabilities: Vec<String>,
}

impl Default for IssuanceProfile {
	fn default() -> Self {
		Self {
			issuer: "themis".to_string(),
			audience: "XMiDT".to_string(),
			subject: "client:supplied".to_string(),
			partner_id: "comcast".to_string(),
			trust: "1000".to_string(),
			capabilities: vec!["x1:issuer:test:.*:all".to_string()],
		}
	}
}

/// Parameters for one issued token. Unset fields fall back to the
/// [`IssuanceProfile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
	pub binding: String,
	pub ttl: Duration,
	pub serial: Option<String>,
	pub partner_id: Option<String>,
	pub capabilities: Option<Vec<String>>,
}

impl IssueRequest {
	pub fn new(binding: impl Into<String>, ttl: Duration) -> Self {
		Self {
			binding: binding.into(),
			ttl,
			serial: None,
			partner_id: None,
			capabilities: None,
		}
	}

	pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
		self.serial = Some(serial.into());
		self
	}

	pub fn with_partner_id(mut self, partner_id: impl Into<String>) -> Self {
		self.partner_id = Some(partner_id.into());
		self
	}

	pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.capabilities = Some(capabilities.into_iter().map(Into::into).collect());
		self
	}
}

/// Issues tokens under one designated key and verifies tokens against a
/// kid-indexed trust store.
///
/// Holds only immutable state once built, so one instance can be shared
/// across any number of concurrent callers.
pub struct TokenAuthority {
	trust_store: Arc<dyn KeyResolver>,
	verifier: Arc<dyn ClaimsVerifier>,
	signing_key: Option<SigningKey>,
	api_policy: TokenClassPolicy,
	device_policy: TokenClassPolicy,
	profile: IssuanceProfile,
}

impl TokenAuthority {
	pub fn builder() -> TokenAuthorityBuilder {
		TokenAuthorityBuilder::default()
	}

	pub fn policy(&self, class: TokenClass) -> &TokenClassPolicy {
		match class {
			TokenClass::Api => &self.api_policy,
			TokenClass::Device => &self.device_policy,
		}
	}

	pub fn profile(&self) -> &IssuanceProfile {
		&self.profile
	}

	pub fn signing_kid(&self) -> Option<&str> {
		self.signing_key.as_ref().map(SigningKey::kid)
	}

	pub fn verifier_name(&self) -> &'static str {
		self.verifier.name()
	}

	/// Kids the trust store can currently resolve.
	pub fn trusted_kids(&self) -> Vec<String> {
		self.trust_store.kids()
	}

	/// Verify a token for `class`.
	///
	/// Checks run in a fixed order and stop at the first failure: header kid,
	/// kid allow-list, capabilities, binding, key lookup, then signature and
	/// temporal claims. Policy checks read the claims before the signature is
	/// verified; only the returned claims are authenticated.
	#[instrument(skip(self, token, binding), fields(class = %class))]
	pub fn verify(
		&self,
		token: &str,
		class: TokenClass,
		binding: Option<&str>,
	) -> TokenResult<TokenClaims> {
		let kid = parse_kid(token).map_err(|e| {
			debug!(error = %e, "rejected token with unreadable header");
			e
		})?;
		self.check(token, &kid, class, binding).map_err(|e| {
			match &e {
				TokenError::UnknownKey { .. } => {
					warn!(kid = %kid, trusted = ?self.trust_store.kids(), "rejected token signed with unknown key")
				}
				_ => debug!(kid = %kid, error = %e, "rejected token"),
			}
			e
		})
	}

	fn check(
		&self,
		token: &str,
		kid: &str,
		class: TokenClass,
		binding: Option<&str>,
	) -> TokenResult<TokenClaims> {
		let policy = self.policy(class);
		if !policy.allows_kid(kid) {
			return Err(TokenError::KidNotAllowed {
				kid: kid.to_string(),
			});
		}

		let unverified = decode_claims_unverified(token)?;
		if !policy.required_capabilities.is_empty()
			&& !unverified.has_any_capability(&policy.required_capabilities)
		{
			return Err(TokenError::InsufficientCapabilities);
		}
		if let Some(binding) = binding {
			if !unverified.is_bound_to(binding) {
				return Err(TokenError::BindingMismatch);
			}
		}

		let key = self
			.trust_store
			.resolve(kid)
			.ok_or_else(|| TokenError::UnknownKey {
				kid: kid.to_string(),
			})?;
		let claims = self.verifier.verify(token, &key)?;
		debug!(kid, verifier = self.verifier.name(), "token accepted");
		Ok(claims)
	}

	/// Verify an API token. API tokens carry no device binding.
	pub fn verify_api_token(&self, token: &str) -> TokenResult<TokenClaims> {
		self.verify(token, TokenClass::Api, None)
	}

	/// Verify a device token, optionally bound to a device identifier.
	pub fn verify_device_token(
		&self,
		token: &str,
		binding: Option<&str>,
	) -> TokenResult<TokenClaims> {
		self.verify(token, TokenClass::Device, binding)
	}

	/// Issue a token bound to `binding` that expires after `ttl`.
	pub fn try_generate(&self, binding: &str, ttl: Duration) -> TokenResult<String> {
		self.try_generate_with(&IssueRequest::new(binding, ttl))
	}

	#[instrument(skip(self, request), fields(ttl_secs = request.ttl.as_secs()))]
	pub fn try_generate_with(&self, request: &IssueRequest) -> TokenResult<String> {
		let signing_key = self.signing_key.as_ref().ok_or_else(|| {
			TokenError::Configuration("no signing key configured".to_string())
		})?;
		let ttl = i64::try_from(request.ttl.as_secs())
			.map_err(|_| TokenError::Configuration("token ttl out of range".to_string()))?;

		let now = Utc::now().timestamp();
		let profile = &self.profile;
		let claims = TokenClaims {
			kid: signing_key.kid().to_string(),
			mac: request.binding.clone(),
			partner_id: request
				.partner_id
				.clone()
				.unwrap_or_else(|| profile.partner_id.clone()),
			serial: request.serial.clone().unwrap_or_default(),
			trust: profile.trust.clone(),
			uuid: Uuid::new_v4().to_string(),
			capabilities: request
				.capabilities
				.clone()
				.unwrap_or_else(|| profile.capabilities.clone()),
			aud: (!profile.audience.is_empty()).then(|| Audience::Single(profile.audience.clone())),
			exp: Some(now.saturating_add(ttl)),
			iat: Some(now),
			nbf: Some(now),
			iss: profile.issuer.clone(),
			sub: profile.subject.clone(),
			jti: Uuid::new_v4().to_string(),
		};

		let mut header = Header::new(Algorithm::RS256);
		header.kid = Some(signing_key.kid().to_string());
		header.typ = None;

		let token = jsonwebtoken::encode(&header, &claims, signing_key.key())
			.map_err(TokenError::Signing)?;
		debug!(kid = signing_key.kid(), jti = %claims.jti, "issued token");
		Ok(token)
	}

	/// Issue a token, returning an empty string on failure.
	///
	/// Callers must treat an empty result as failure. Prefer
	/// [`try_generate`](Self::try_generate) in new code.
	pub fn generate(&self, binding: &str, ttl: Duration) -> String {
		match self.try_generate(binding, ttl) {
			Ok(token) => token,
			Err(e) => {
				error!(error = %e, "token issuance failed, returning empty token");
				String::new()
			}
		}
	}
}

impl std::fmt::Debug for TokenAuthority {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenAuthority")
			.field("verifier", &self.verifier.name())
			.field("signing_key", &self.signing_key)
			.field("api_policy", &self.api_policy)
			.field("device_policy", &self.device_policy)
			.field("profile", &self.profile)
			.finish()
	}
}

/// Builder for [`TokenAuthority`].
#[derive(Default)]
pub struct TokenAuthorityBuilder {
	trust_store: Option<Arc<dyn KeyResolver>>,
	verifier_kind: VerifierKind,
	verifier: Option<Arc<dyn ClaimsVerifier>>,
	audience: Option<String>,
	signing_key: Option<SigningKey>,
	api_policy: TokenClassPolicy,
	device_policy: TokenClassPolicy,
	profile: IssuanceProfile,
}

impl TokenAuthorityBuilder {
	pub fn trust_store(mut self, store: Arc<dyn KeyResolver>) -> Self {
		self.trust_store = Some(store);
		self
	}

	pub fn keyring(self, keyring: Keyring) -> Self {
		self.trust_store(Arc::new(keyring))
	}

	pub fn key_set_cache(self, cache: KeySetCache) -> Self {
		self.trust_store(Arc::new(cache))
	}

	pub fn verifier_kind(mut self, kind: VerifierKind) -> Self {
		self.verifier_kind = kind;
		self
	}

	/// Use a custom verifier instead of a built-in kind.
	pub fn verifier(mut self, verifier: Arc<dyn ClaimsVerifier>) -> Self {
		self.verifier = Some(verifier);
		self
	}

	/// Audience the current verifier requires.
	pub fn audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());
		self
	}

	pub fn signing_key(mut self, key: SigningKey) -> Self {
		self.signing_key = Some(key);
		self
	}

	pub fn api_policy(mut self, policy: TokenClassPolicy) -> Self {
		self.api_policy = policy;
		self
	}

	pub fn device_policy(mut self, policy: TokenClassPolicy) -> Self {
		self.device_policy = policy;
		self
	}

	pub fn issuance_profile(mut self, profile: IssuanceProfile) -> Self {
		self.profile = profile;
		self
	}

	pub fn build(self) -> TokenResult<TokenAuthority> {
		let trust_store = self
			.trust_store
			.ok_or_else(|| TokenError::Configuration("no trust store configured".to_string()))?;
		let verifier = self
			.verifier
			.unwrap_or_else(|| self.verifier_kind.build(self.audience.as_deref()));

		if let Some(key) = &self.signing_key {
			if key.kid().is_empty() {
				return Err(TokenError::Configuration(
					"signing key has an empty kid".to_string(),
				));
			}
		}
		if self.api_policy.allowed_kids.is_empty() && self.device_policy.allowed_kids.is_empty() {
			warn!("no kids allowed for any token class, every token will be rejected");
		}

		Ok(TokenAuthority {
			trust_store,
			verifier,
			signing_key: self.signing_key,
			api_policy: self.api_policy,
			device_policy: self.device_policy,
			profile: self.profile,
		})
	}
}
