// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token issuance and verification configuration section.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layer::merge_section;

pub const DEFAULT_SIGNING_KID: &str = "webconfig_key";
pub const DEFAULT_TTL_SECS: u64 = 24 * 60 * 60;

/// Which verification rules apply to incoming tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierSetting {
	#[default]
	Current,
	Legacy,
}

impl std::fmt::Display for VerifierSetting {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			VerifierSetting::Current => write!(f, "current"),
			VerifierSetting::Legacy => write!(f, "legacy"),
		}
	}
}

impl std::str::FromStr for VerifierSetting {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"current" => Ok(VerifierSetting::Current),
			"legacy" => Ok(VerifierSetting::Legacy),
			_ => Err(ConfigError::InvalidValue {
				key: "token.verifier".to_string(),
				message: format!("unknown verifier '{s}', expected 'current' or 'legacy'"),
			}),
		}
	}
}

/// Per token class policy. Omitted `allowed_kids` defaults to the signing kid;
/// an explicit empty list accepts nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassPolicyConfigLayer {
	pub allowed_kids: Option<Vec<String>>,
	pub capabilities: Option<Vec<String>>,
}

impl ClassPolicyConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.allowed_kids.is_some() {
			self.allowed_kids = other.allowed_kids;
		}
		if other.capabilities.is_some() {
			self.capabilities = other.capabilities;
		}
	}

	fn finalize(self, signing_kid: &str) -> ClassPolicyConfig {
		ClassPolicyConfig {
			allowed_kids: self
				.allowed_kids
				.unwrap_or_else(|| vec![signing_kid.to_string()]),
			capabilities: self.capabilities.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassPolicyConfig {
	pub allowed_kids: Vec<String>,
	pub capabilities: Vec<String>,
}

/// Overrides for the fixed claims stamped on issued tokens. Unset fields keep
/// the built-in profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IssuanceConfigLayer {
	pub issuer: Option<String>,
	pub audience: Option<String>,
	pub subject: Option<String>,
	pub partner_id: Option<String>,
	pub trust: Option<String>,
	pub capabilities: Option<Vec<String>>,
}

impl IssuanceConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.issuer.is_some() {
			self.issuer = other.issuer;
		}
		if other.audience.is_some() {
			self.audience = other.audience;
		}
		if other.subject.is_some() {
			self.subject = other.subject;
		}
		if other.partner_id.is_some() {
			self.partner_id = other.partner_id;
		}
		if other.trust.is_some() {
			self.trust = other.trust;
		}
		if other.capabilities.is_some() {
			self.capabilities = other.capabilities;
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenConfigLayer {
	pub signing_kid: Option<String>,
	pub signing_key_path: Option<PathBuf>,
	pub verifier: Option<VerifierSetting>,
	pub audience: Option<String>,
	/// kid to public key PEM path.
	pub keyring: Option<BTreeMap<String, PathBuf>>,
	pub api: Option<ClassPolicyConfigLayer>,
	pub device: Option<ClassPolicyConfigLayer>,
	pub issuance: Option<IssuanceConfigLayer>,
	pub default_ttl_secs: Option<u64>,
}

impl TokenConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.signing_kid.is_some() {
			self.signing_kid = other.signing_kid;
		}
		if other.signing_key_path.is_some() {
			self.signing_key_path = other.signing_key_path;
		}
		if other.verifier.is_some() {
			self.verifier = other.verifier;
		}
		if other.audience.is_some() {
			self.audience = other.audience;
		}
		if other.keyring.is_some() {
			self.keyring = other.keyring;
		}
		if other.default_ttl_secs.is_some() {
			self.default_ttl_secs = other.default_ttl_secs;
		}
		merge_section(&mut self.api, other.api, ClassPolicyConfigLayer::merge);
		merge_section(&mut self.device, other.device, ClassPolicyConfigLayer::merge);
		merge_section(&mut self.issuance, other.issuance, IssuanceConfigLayer::merge);
	}

	pub fn finalize(self) -> Result<TokenConfig, ConfigError> {
		let signing_kid = self
			.signing_kid
			.unwrap_or_else(|| DEFAULT_SIGNING_KID.to_string());
		if signing_kid.trim().is_empty() {
			return Err(ConfigError::InvalidValue {
				key: "token.signing_kid".to_string(),
				message: "must not be empty".to_string(),
			});
		}

		let default_ttl_secs = self.default_ttl_secs.unwrap_or(DEFAULT_TTL_SECS);
		if default_ttl_secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "token.default_ttl_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		let keyring = self.keyring.unwrap_or_default();
		if let Some(kid) = keyring.keys().find(|k| k.trim().is_empty()) {
			return Err(ConfigError::InvalidValue {
				key: "token.keyring".to_string(),
				message: format!("keyring entry with empty kid '{kid}'"),
			});
		}

		Ok(TokenConfig {
			api: self.api.unwrap_or_default().finalize(&signing_kid),
			device: self.device.unwrap_or_default().finalize(&signing_kid),
			signing_kid,
			signing_key_path: self.signing_key_path,
			verifier: self.verifier.unwrap_or_default(),
			audience: self.audience.filter(|a| !a.is_empty()),
			keyring,
			issuance: self.issuance.unwrap_or_default(),
			default_ttl_secs,
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenConfig {
	pub signing_kid: String,
	pub signing_key_path: Option<PathBuf>,
	pub verifier: VerifierSetting,
	pub audience: Option<String>,
	pub keyring: BTreeMap<String, PathBuf>,
	pub api: ClassPolicyConfig,
	pub device: ClassPolicyConfig,
	pub issuance: IssuanceConfigLayer,
	pub default_ttl_secs: u64,
}

impl TokenConfig {
	pub fn can_issue(&self) -> bool {
		self.signing_key_path.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = TokenConfigLayer::default().finalize().unwrap();
		assert_eq!(config.signing_kid, DEFAULT_SIGNING_KID);
		assert_eq!(config.verifier, VerifierSetting::Current);
		assert_eq!(config.default_ttl_secs, DEFAULT_TTL_SECS);
		assert_eq!(config.api.allowed_kids, vec![DEFAULT_SIGNING_KID]);
		assert_eq!(config.device.allowed_kids, vec![DEFAULT_SIGNING_KID]);
		assert!(config.api.capabilities.is_empty());
		assert!(config.keyring.is_empty());
		assert!(!config.can_issue());
	}

	#[test]
	fn test_empty_signing_kid_rejected() {
		let layer = TokenConfigLayer {
			signing_kid: Some(String::new()),
			..Default::default()
		};
		let err = layer.finalize().unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "token.signing_kid"));
	}

	#[test]
	fn test_zero_ttl_rejected() {
		let layer = TokenConfigLayer {
			default_ttl_secs: Some(0),
			..Default::default()
		};
		assert!(layer.finalize().is_err());
	}

	#[test]
	fn test_explicit_empty_allowed_kids_kept() {
		let layer = TokenConfigLayer {
			api: Some(ClassPolicyConfigLayer {
				allowed_kids: Some(Vec::new()),
				capabilities: None,
			}),
			..Default::default()
		};
		let config = layer.finalize().unwrap();
		assert!(config.api.allowed_kids.is_empty());
		assert_eq!(config.device.allowed_kids, vec![DEFAULT_SIGNING_KID]);
	}

	#[test]
	fn test_policy_defaults_follow_signing_kid() {
		let layer = TokenConfigLayer {
			signing_kid: Some("rotated_key".to_string()),
			..Default::default()
		};
		let config = layer.finalize().unwrap();
		assert_eq!(config.api.allowed_kids, vec!["rotated_key"]);
	}

	#[test]
	fn test_merge_nested_sections() {
		let mut base = TokenConfigLayer {
			api: Some(ClassPolicyConfigLayer {
				allowed_kids: Some(vec!["a".to_string()]),
				capabilities: Some(vec!["cap:read".to_string()]),
			}),
			issuance: Some(IssuanceConfigLayer {
				issuer: Some("themis".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(TokenConfigLayer {
			api: Some(ClassPolicyConfigLayer {
				allowed_kids: Some(vec!["b".to_string()]),
				capabilities: None,
			}),
			issuance: Some(IssuanceConfigLayer {
				trust: Some("0".to_string()),
				..Default::default()
			}),
			..Default::default()
		});

		let api = base.api.as_ref().unwrap();
		assert_eq!(api.allowed_kids, Some(vec!["b".to_string()]));
		assert_eq!(api.capabilities, Some(vec!["cap:read".to_string()]));
		let issuance = base.issuance.as_ref().unwrap();
		assert_eq!(issuance.issuer.as_deref(), Some("themis"));
		assert_eq!(issuance.trust.as_deref(), Some("0"));
	}

	#[test]
	fn test_toml_deserialize() {
		let layer: TokenConfigLayer = toml::from_str(
			r#"
			signing_kid = "webconfig_key"
			signing_key_path = "/etc/webconfig/keys/webconfig_key.pem"
			verifier = "legacy"

			[keyring]
			webconfig_key = "/etc/webconfig/keys/webconfig_key.pub.pem"
			rotated_key = "/etc/webconfig/keys/rotated_key.pub.pem"

			[device]
			capabilities = ["x1:issuer:test:.*:all"]

			[issuance]
			partner_id = "example"
			"#,
		)
		.unwrap();

		let config = layer.finalize().unwrap();
		assert_eq!(config.verifier, VerifierSetting::Legacy);
		assert_eq!(config.keyring.len(), 2);
		assert!(config.can_issue());
		assert_eq!(config.device.capabilities, vec!["x1:issuer:test:.*:all"]);
		assert_eq!(config.issuance.partner_id.as_deref(), Some("example"));
	}

	#[test]
	fn test_verifier_parse() {
		assert_eq!("Legacy".parse::<VerifierSetting>().unwrap(), VerifierSetting::Legacy);
		assert!("strict".parse::<VerifierSetting>().is_err());
	}
}
