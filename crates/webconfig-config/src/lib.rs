// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the webconfig security services.
//!
//! Sources are merged in precedence order:
//! 1. Environment variables (`WEBCONFIG_*`)
//! 2. Config file (`/etc/webconfig/security.toml` unless overridden)
//! 3. Built-in defaults
//!
//! ```toml
//! [codec]
//! key = "base64 AES key"
//!
//! [token]
//! signing_kid = "webconfig_key"
//! signing_key_path = "/etc/webconfig/keys/webconfig_key.pem"
//! verifier = "current"
//!
//! [token.keyring]
//! webconfig_key = "/etc/webconfig/keys/webconfig_key.pub.pem"
//!
//! [jwks]
//! uri = "https://keys.example.com/jwks"
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod secret;
pub mod sections;
pub mod sources;

use std::path::PathBuf;

use tracing::{debug, info};

pub use env::{load_secret_env, load_secret_with, SecretEnvError};
pub use error::ConfigError;
pub use layer::SecurityConfigLayer;
pub use secret::SecretString;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
	pub codec: CodecConfig,
	pub token: TokenConfig,
	/// Remote key set. When absent the keyring is the trust store.
	pub jwks: Option<JwksConfig>,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<SecurityConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::new()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<SecurityConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::new()),
	])
}

/// Merge an arbitrary set of sources by precedence and finalize.
pub fn load_config_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<SecurityConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = SecurityConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: SecurityConfigLayer) -> Result<SecurityConfig, ConfigError> {
	let codec = layer.codec.unwrap_or_default().finalize();
	let token = layer.token.unwrap_or_default().finalize()?;
	let jwks = match layer.jwks {
		Some(jwks) => jwks.finalize()?,
		None => None,
	};
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&token, jwks.as_ref())?;

	info!(
		codec_keyed = codec.is_keyed(),
		signing_kid = %token.signing_kid,
		can_issue = token.can_issue(),
		verifier = %token.verifier,
		keyring_size = token.keyring.len(),
		jwks_configured = jwks.is_some(),
		"Security configuration loaded"
	);

	Ok(SecurityConfig {
		codec,
		token,
		jwks,
		logging,
	})
}

/// Validate cross-section rules.
fn validate_config(token: &TokenConfig, jwks: Option<&JwksConfig>) -> Result<(), ConfigError> {
	if token.keyring.is_empty() && jwks.is_none() {
		return Err(ConfigError::Validation(
			"no trust store configured: set token.keyring or jwks.uri".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn write_toml(content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	fn load(file: &tempfile::NamedTempFile, env: &[(&str, &str)]) -> Result<SecurityConfig, ConfigError> {
		load_config_from_sources(vec![
			Box::new(EnvSource::from_vars(env.iter().copied())),
			Box::new(TomlSource::new(file.path())),
			Box::new(DefaultsSource),
		])
	}

	const KEYRING_TOML: &str = r#"
[token.keyring]
webconfig_key = "/etc/webconfig/keys/webconfig_key.pub.pem"
"#;

	#[test]
	fn test_requires_a_trust_store() {
		let file = write_toml("");
		let err = load(&file, &[]).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_keyring_only_is_valid() {
		let file = write_toml(KEYRING_TOML);
		let config = load(&file, &[]).unwrap();
		assert!(config.jwks.is_none());
		assert!(!config.codec.is_keyed());
		assert_eq!(config.token.signing_kid, DEFAULT_SIGNING_KID);
		assert_eq!(config.logging.level, "info");
	}

	#[test]
	fn test_jwks_only_is_valid() {
		let file = write_toml("");
		let config = load(&file, &[("WEBCONFIG_JWKS_URI", "https://keys.example.com/jwks")]).unwrap();
		assert!(config.token.keyring.is_empty());
		assert_eq!(
			config.jwks.unwrap().refresh_interval_secs,
			DEFAULT_REFRESH_INTERVAL_SECS
		);
	}

	#[test]
	fn test_environment_overrides_file() {
		let file = write_toml(
			r#"
[token]
verifier = "legacy"
default_ttl_secs = 60

[token.keyring]
webconfig_key = "/keys/a.pub.pem"

[logging]
level = "debug"
"#,
		);
		let config = load(
			&file,
			&[
				("WEBCONFIG_TOKEN_VERIFIER", "current"),
				("WEBCONFIG_LOGGING_FORMAT", "json"),
			],
		)
		.unwrap();
		assert_eq!(config.token.verifier, VerifierSetting::Current);
		assert_eq!(config.token.default_ttl_secs, 60);
		assert_eq!(config.logging.level, "debug");
		assert_eq!(config.logging.format, LogFormat::Json);
	}

	#[test]
	fn test_empty_signing_kid_from_env_rejected() {
		let file = write_toml(KEYRING_TOML);
		let err = load(&file, &[("WEBCONFIG_TOKEN_SIGNING_KID", "")]).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}

	#[test]
	fn test_zero_jwks_interval_rejected() {
		let file = write_toml(
			r#"
[jwks]
uri = "https://keys.example.com/jwks"
refresh_interval_secs = 0
"#,
		);
		assert!(load(&file, &[]).is_err());
	}

	#[test]
	fn test_malformed_file_surfaces_path() {
		let file = write_toml("[token\n");
		let err = load(&file, &[]).unwrap_err();
		assert!(err.to_string().contains(&file.path().display().to_string()));
	}

	#[test]
	fn test_debug_never_prints_codec_key() {
		let file = write_toml(
			r#"
[codec]
key = "AAECAwQFBgcICQoLDA0ODw=="

[token.keyring]
webconfig_key = "/keys/a.pub.pem"
"#,
		);
		let config = load(&file, &[]).unwrap();
		assert!(config.codec.is_keyed());
		assert!(!format!("{config:?}").contains("AAECAwQF"));
	}
}
