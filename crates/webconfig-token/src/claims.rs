// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Device token claims.

use serde::{Deserialize, Deserializer, Serialize};

/// Audience claim, which peers send either as one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
	Single(String),
	Many(Vec<String>),
}

impl Audience {
	pub fn contains(&self, audience: &str) -> bool {
		match self {
			Audience::Single(a) => a == audience,
			Audience::Many(all) => all.iter().any(|a| a == audience),
		}
	}
}

/// Peers serialize unset lists and strings as `null`; treat that like an
/// absent claim.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Claims carried by device and API tokens.
///
/// Field names on the wire are fixed by the systems that consume these
/// tokens.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
	#[serde(
		default,
		deserialize_with = "null_as_default",
		skip_serializing_if = "String::is_empty"
	)]
	pub kid: String,

	/// Device binding, usually a MAC address.
	#[serde(
		default,
		deserialize_with = "null_as_default",
		skip_serializing_if = "String::is_empty"
	)]
	pub mac: String,

	#[serde(
		rename = "partner-id",
		default,
		deserialize_with = "null_as_default",
		skip_serializing_if = "String::is_empty"
	)]
	pub partner_id: String,

	#[serde(
		default,
		deserialize_with = "null_as_default",
		skip_serializing_if = "String::is_empty"
	)]
	pub serial: String,

	#[serde(
		default,
		deserialize_with = "null_as_default",
		skip_serializing_if = "String::is_empty"
	)]
	pub trust: String,

	/// Correlation id.
	#[serde(
		default,
		deserialize_with = "null_as_default",
		skip_serializing_if = "String::is_empty"
	)]
	pub uuid: String,

	#[serde(default, deserialize_with = "null_as_default")]
	pub capabilities: Vec<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub aud: Option<Audience>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exp: Option<i64>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iat: Option<i64>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nbf: Option<i64>,

	#[serde(
		default,
		deserialize_with = "null_as_default",
		skip_serializing_if = "String::is_empty"
	)]
	pub iss: String,

	#[serde(
		default,
		deserialize_with = "null_as_default",
		skip_serializing_if = "String::is_empty"
	)]
	pub sub: String,

	#[serde(
		default,
		deserialize_with = "null_as_default",
		skip_serializing_if = "String::is_empty"
	)]
	pub jti: String,
}

impl TokenClaims {
	/// Returns true if any of `required` appears verbatim in the capability
	/// list.
	pub fn has_any_capability<S: AsRef<str>>(&self, required: &[S]) -> bool {
		required
			.iter()
			.any(|r| self.capabilities.iter().any(|c| c == r.as_ref()))
	}

	/// Returns true if the token is bound to `binding`, ignoring case. An
	/// empty binding claim binds to nothing.
	pub fn is_bound_to(&self, binding: &str) -> bool {
		!self.mac.is_empty() && self.mac.eq_ignore_ascii_case(binding)
	}

	/// Returns true if `exp` is present and not after `now` (unix seconds).
	pub fn is_expired_at(&self, now: i64) -> bool {
		self.exp.is_some_and(|exp| exp <= now)
	}

	pub fn is_expired(&self) -> bool {
		self.is_expired_at(chrono::Utc::now().timestamp())
	}
}

impl std::fmt::Debug for TokenClaims {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenClaims")
			.field("kid", &self.kid)
			.field("mac", &"[REDACTED]")
			.field("partner_id", &self.partner_id)
			.field("serial", &"[REDACTED]")
			.field("trust", &self.trust)
			.field("uuid", &self.uuid)
			.field("capabilities", &self.capabilities)
			.field("aud", &self.aud)
			.field("exp", &self.exp)
			.field("iat", &self.iat)
			.field("nbf", &self.nbf)
			.field("iss", &self.iss)
			.field("sub", &self.sub)
			.field("jti", &self.jti)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn uses_wire_field_names() {
		let claims = TokenClaims {
			kid: "webconfig_key".into(),
			mac: "112233445566".into(),
			partner_id: "comcast".into(),
			capabilities: vec!["x1:issuer:test:.*:all".into()],
			aud: Some(Audience::Single("XMiDT".into())),
			exp: Some(100),
			..Default::default()
		};
		let json = serde_json::to_value(&claims).unwrap();
		assert_eq!(json["partner-id"], "comcast");
		assert_eq!(json["aud"], "XMiDT");
		assert_eq!(json["exp"], 100);
		assert!(json.get("serial").is_none());
		assert!(json.get("nbf").is_none());
	}

	#[test]
	fn audience_accepts_string_or_list() {
		let single: TokenClaims = serde_json::from_str(r#"{"aud":"XMiDT"}"#).unwrap();
		assert_eq!(single.aud, Some(Audience::Single("XMiDT".into())));
		let many: TokenClaims = serde_json::from_str(r#"{"aud":["a","XMiDT"]}"#).unwrap();
		assert!(many.aud.unwrap().contains("XMiDT"));
	}

	#[test]
	fn missing_fields_default() {
		let claims: TokenClaims = serde_json::from_str("{}").unwrap();
		assert!(claims.capabilities.is_empty());
		assert!(claims.exp.is_none());
		assert!(!claims.is_expired());
	}

	#[test]
	fn null_claims_read_as_absent() {
		let claims: TokenClaims = serde_json::from_str(
			r#"{"mac":null,"capabilities":null,"partner-id":null,"serial":null,"exp":100}"#,
		)
		.unwrap();
		assert!(claims.mac.is_empty());
		assert!(claims.capabilities.is_empty());
		assert!(claims.partner_id.is_empty());
		assert_eq!(claims.exp, Some(100));
	}

	#[test]
	fn binding_ignores_case() {
		let claims = TokenClaims {
			mac: "AA:BB:CC:DD:EE:FF".into(),
			..Default::default()
		};
		assert!(claims.is_bound_to("aa:bb:cc:dd:ee:ff"));
		assert!(!claims.is_bound_to("aa:bb:cc:dd:ee:00"));
	}

	#[test]
	fn empty_binding_claim_matches_nothing() {
		let claims = TokenClaims::default();
		assert!(!claims.is_bound_to(""));
		assert!(!claims.is_bound_to("aabbccddeeff"));
	}

	#[test]
	fn expiry_is_inclusive() {
		let claims = TokenClaims {
			exp: Some(1_000),
			..Default::default()
		};
		assert!(!claims.is_expired_at(999));
		assert!(claims.is_expired_at(1_000));
	}

	#[test]
	fn debug_redacts_device_identity() {
		let claims = TokenClaims {
			mac: "112233445566".into(),
			serial: "SN-0042".into(),
			..Default::default()
		};
		let debug = format!("{claims:?}");
		assert!(!debug.contains("112233445566"));
		assert!(!debug.contains("SN-0042"));
	}

	proptest! {
		#[test]
		fn prop_any_capability_is_or(
			granted in proptest::collection::vec("[a-z:]{1,12}", 0..6),
			required in proptest::collection::vec("[a-z:]{1,12}", 0..6),
		) {
			let claims = TokenClaims { capabilities: granted.clone(), ..Default::default() };
			let expected = required.iter().any(|r| granted.contains(r));
			prop_assert_eq!(claims.has_any_capability(&required), expected);
		}

		#[test]
		fn prop_binding_matches_any_casing(mac in "[0-9a-f]{12}") {
			let claims = TokenClaims { mac: mac.to_uppercase(), ..Default::default() };
			prop_assert!(claims.is_bound_to(&mac));
		}
	}
}
