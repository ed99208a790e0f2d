// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds the codec, trust store and token authority from configuration.

use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use webconfig_codec::SecretCodec;
use webconfig_config::{
	ClassPolicyConfig, CodecConfig, IssuanceConfigLayer, JwksConfig, SecurityConfig, TokenConfig,
	VerifierSetting,
};
use webconfig_jwks::{KeySetCache, KeySetCacheConfig, RefreshTask};
use webconfig_token::{
	IssuanceProfile, Keyring, SigningKey, TokenAuthority, TokenClassPolicy, VerifierKind,
};

/// Everything a command needs, built once at startup.
pub struct SecurityServices {
	pub codec: SecretCodec,
	pub authority: TokenAuthority,
	refresh_task: Option<RefreshTask>,
}

impl SecurityServices {
	pub async fn start(config: &SecurityConfig) -> anyhow::Result<Self> {
		let codec = build_codec(&config.codec)?;
		let (authority, refresh_task) = build_authority(&config.token, config.jwks.as_ref()).await?;
		Ok(Self {
			codec,
			authority,
			refresh_task,
		})
	}

	pub fn shutdown(self) {
		if let Some(task) = self.refresh_task {
			task.cancel();
		}
	}
}

pub fn build_codec(config: &CodecConfig) -> anyhow::Result<SecretCodec> {
	SecretCodec::from_base64_key(config.key.as_ref().map(|k| k.expose()))
		.context("invalid codec key")
}

pub fn key_set_cache_config(config: &JwksConfig) -> KeySetCacheConfig {
	KeySetCacheConfig::new(config.uri.clone())
		.with_refresh_interval(Duration::from_secs(config.refresh_interval_secs))
		.with_min_refresh_interval(Duration::from_secs(config.min_refresh_interval_secs))
		.with_fetch_timeout(Duration::from_secs(config.timeout_secs))
}

fn verifier_kind(setting: VerifierSetting) -> VerifierKind {
	match setting {
		VerifierSetting::Current => VerifierKind::Current,
		VerifierSetting::Legacy => VerifierKind::Legacy,
	}
}

fn class_policy(config: &ClassPolicyConfig) -> TokenClassPolicy {
	TokenClassPolicy::new(config.allowed_kids.iter().cloned())
		.with_required_capabilities(config.capabilities.iter().cloned())
}

pub fn issuance_profile(overrides: &IssuanceConfigLayer) -> IssuanceProfile {
	let mut profile = IssuanceProfile::default();
	if let Some(issuer) = &overrides.issuer {
		profile.issuer = issuer.clone();
	}
	if let Some(audience) = &overrides.audience {
		profile.audience = audience.clone();
	}
	if let Some(subject) = &overrides.subject {
		profile.subject = subject.clone();
	}
	if let Some(partner_id) = &overrides.partner_id {
		profile.partner_id = partner_id.clone();
	}
	if let Some(trust) = &overrides.trust {
		profile.trust = trust.clone();
	}
	if let Some(capabilities) = &overrides.capabilities {
		profile.capabilities = capabilities.clone();
	}
	profile
}

/// Build the authority. A configured key set takes precedence over the
/// keyring; its refresh task is returned so the caller can stop it.
pub async fn build_authority(
	token: &TokenConfig,
	jwks: Option<&JwksConfig>,
) -> anyhow::Result<(TokenAuthority, Option<RefreshTask>)> {
	let mut builder = TokenAuthority::builder()
		.verifier_kind(verifier_kind(token.verifier))
		.api_policy(class_policy(&token.api))
		.device_policy(class_policy(&token.device))
		.issuance_profile(issuance_profile(&token.issuance));

	if let Some(audience) = &token.audience {
		builder = builder.audience(audience.clone());
	}

	if let Some(path) = &token.signing_key_path {
		let key = SigningKey::from_file(token.signing_kid.clone(), path)
			.with_context(|| format!("failed to load signing key {}", path.display()))?;
		builder = builder.signing_key(key);
	}

	let refresh_task = match jwks {
		Some(jwks) => {
			if !token.keyring.is_empty() {
				warn!(uri = %jwks.uri, "both keyring and key set configured, using key set");
			}
			let (cache, task) = KeySetCache::start(key_set_cache_config(jwks), None)
				.await
				.context("failed to start key set cache")?;
			builder = builder.key_set_cache(cache);
			Some(task)
		}
		None => {
			let keyring = Keyring::from_files(token.keyring.iter().map(|(kid, path)| (kid.clone(), path)))
				.context("failed to load keyring")?;
			builder = builder.keyring(keyring);
			None
		}
	};

	let authority = builder.build().context("failed to build token authority")?;
	info!(
		verifier = authority.verifier_name(),
		signing_kid = authority.signing_kid().unwrap_or("-"),
		trusted_kids = authority.trusted_kids().len(),
		"token authority ready"
	);
	Ok((authority, refresh_task))
}
