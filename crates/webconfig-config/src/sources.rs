// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment
//! variables.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::load_secret_with;
use crate::error::ConfigError;
use crate::layer::SecurityConfigLayer;
use crate::secret::SecretString;
use crate::sections::{
	ClassPolicyConfigLayer, CodecConfigLayer, IssuanceConfigLayer, JwksConfigLayer, LogFormat,
	LoggingConfigLayer, TokenConfigLayer, VerifierSetting,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<SecurityConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<SecurityConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(SecurityConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/webconfig/security.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<SecurityConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(SecurityConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: SecurityConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: WEBCONFIG_<SECTION>_<FIELD>. Lists are comma separated and the
/// keyring is `kid=path` pairs, e.g.
/// `WEBCONFIG_TOKEN_KEYRING=webconfig_key=/keys/a.pem,rotated_key=/keys/b.pem`.
#[derive(Default)]
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads from a fixed set of variables instead of the process environment.
	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(
				vars.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	fn lookup(&self, name: &str) -> Option<String> {
		match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		}
	}

	fn env_var(&self, name: &str) -> Option<String> {
		self.lookup(name).filter(|s| !s.is_empty())
	}

	fn env_u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		match self.env_var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid u64 value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn env_list(&self, name: &str) -> Option<Vec<String>> {
		self.env_var(name).map(|v| {
			v.split(',')
				.map(str::trim)
				.filter(|s| !s.is_empty())
				.map(String::from)
				.collect()
		})
	}

	fn env_keyring(&self, name: &str) -> Result<Option<BTreeMap<String, PathBuf>>, ConfigError> {
		let Some(value) = self.env_var(name) else {
			return Ok(None);
		};

		let mut keyring = BTreeMap::new();
		for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
			let (kid, path) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("expected kid=path, got '{entry}'"),
			})?;
			keyring.insert(kid.trim().to_string(), PathBuf::from(path.trim()));
		}
		Ok(Some(keyring))
	}

	fn load_codec(&self) -> Result<CodecConfigLayer, ConfigError> {
		let key = load_secret_with("WEBCONFIG_CODEC_KEY", |name| self.lookup(name))
			.map_err(|e| ConfigError::Secret(e.to_string()))?;
		Ok(CodecConfigLayer {
			key: key.map(SecretString::from),
		})
	}

	fn load_class_policy(&self, class: &str) -> ClassPolicyConfigLayer {
		ClassPolicyConfigLayer {
			allowed_kids: self.env_list(&format!("WEBCONFIG_TOKEN_{class}_ALLOWED_KIDS")),
			capabilities: self.env_list(&format!("WEBCONFIG_TOKEN_{class}_CAPABILITIES")),
		}
	}

	fn load_token(&self) -> Result<TokenConfigLayer, ConfigError> {
		let verifier = self
			.env_var("WEBCONFIG_TOKEN_VERIFIER")
			.map(|v| {
				v.parse::<VerifierSetting>()
					.map_err(|_| ConfigError::InvalidValue {
						key: "WEBCONFIG_TOKEN_VERIFIER".to_string(),
						message: format!("unknown verifier '{v}', expected 'current' or 'legacy'"),
					})
			})
			.transpose()?;

		Ok(TokenConfigLayer {
			signing_kid: self.lookup("WEBCONFIG_TOKEN_SIGNING_KID"),
			signing_key_path: self
				.env_var("WEBCONFIG_TOKEN_SIGNING_KEY_PATH")
				.map(PathBuf::from),
			verifier,
			audience: self.env_var("WEBCONFIG_TOKEN_AUDIENCE"),
			keyring: self.env_keyring("WEBCONFIG_TOKEN_KEYRING")?,
			api: Some(self.load_class_policy("API")),
			device: Some(self.load_class_policy("DEVICE")),
			issuance: Some(IssuanceConfigLayer {
				issuer: self.env_var("WEBCONFIG_TOKEN_ISSUER"),
				audience: self.env_var("WEBCONFIG_TOKEN_ISSUED_AUDIENCE"),
				subject: self.env_var("WEBCONFIG_TOKEN_SUBJECT"),
				partner_id: self.env_var("WEBCONFIG_TOKEN_PARTNER_ID"),
				trust: self.env_var("WEBCONFIG_TOKEN_TRUST"),
				capabilities: self.env_list("WEBCONFIG_TOKEN_CAPABILITIES"),
			}),
			default_ttl_secs: self.env_u64("WEBCONFIG_TOKEN_DEFAULT_TTL_SECS")?,
		})
	}

	fn load_jwks(&self) -> Result<JwksConfigLayer, ConfigError> {
		Ok(JwksConfigLayer {
			uri: self.env_var("WEBCONFIG_JWKS_URI"),
			refresh_interval_secs: self.env_u64("WEBCONFIG_JWKS_REFRESH_INTERVAL_SECS")?,
			min_refresh_interval_secs: self.env_u64("WEBCONFIG_JWKS_MIN_REFRESH_INTERVAL_SECS")?,
			timeout_secs: self.env_u64("WEBCONFIG_JWKS_TIMEOUT_SECS")?,
		})
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		let format = self
			.env_var("WEBCONFIG_LOGGING_FORMAT")
			.map(|v| v.parse::<LogFormat>())
			.transpose()?;
		Ok(LoggingConfigLayer {
			level: self.env_var("WEBCONFIG_LOGGING_LEVEL"),
			format,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<SecurityConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(SecurityConfigLayer {
			codec: Some(self.load_codec()?),
			token: Some(self.load_token()?),
			jwks: Some(self.load_jwks()?),
			logging: Some(self.load_logging()?),
		})
	}
}
