// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Unverified inspection of compact JWS tokens.
//!
//! Nothing here checks a signature. It exists so policy checks can run, and
//! fail with precise errors, before any key is looked up.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::claims::TokenClaims;
use crate::error::{TokenError, TokenResult};

#[derive(Deserialize)]
struct RawHeader {
	#[serde(default)]
	kid: Option<String>,
}

struct Segments<'a> {
	header: &'a str,
	payload: &'a str,
}

fn segments(token: &str) -> TokenResult<Segments<'_>> {
	let mut parts = token.split('.');
	match (parts.next(), parts.next(), parts.next(), parts.next()) {
		(Some(header), Some(payload), Some(_signature), None)
			if !header.is_empty() && !payload.is_empty() =>
		{
			Ok(Segments { header, payload })
		}
		_ => Err(TokenError::Malformed(
			"expected three dot-separated segments".to_string(),
		)),
	}
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> TokenResult<T> {
	let bytes = URL_SAFE_NO_PAD
		.decode(segment.trim_end_matches('='))
		.map_err(|e| TokenError::Malformed(format!("{what} is not base64url: {e}")))?;
	serde_json::from_slice(&bytes)
		.map_err(|e| TokenError::Malformed(format!("{what} is not valid JSON: {e}")))
}

/// Extract the `kid` from a token header without verifying anything.
pub fn parse_kid(token: &str) -> TokenResult<String> {
	let segments = segments(token)?;
	let header: RawHeader = decode_segment(segments.header, "header")?;
	header
		.kid
		.filter(|kid| !kid.is_empty())
		.ok_or(TokenError::MissingKid)
}

/// Decode the claims without verifying the signature.
pub(crate) fn decode_claims_unverified(token: &str) -> TokenResult<TokenClaims> {
	let segments = segments(token)?;
	decode_segment(segments.payload, "payload")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn encode(json: &str) -> String {
		URL_SAFE_NO_PAD.encode(json)
	}

	fn token(header: &str, payload: &str) -> String {
		format!("{}.{}.sig", encode(header), encode(payload))
	}

	#[test]
	fn extracts_kid() {
		let t = token(r#"{"alg":"RS256","kid":"webconfig_key"}"#, "{}");
		assert_eq!(parse_kid(&t).unwrap(), "webconfig_key");
	}

	#[test]
	fn tolerates_padded_segments() {
		let header = base64::engine::general_purpose::URL_SAFE
			.encode(r#"{"alg":"RS256","kid":"k"}"#);
		assert!(header.ends_with('='));
		assert_eq!(parse_kid(&format!("{header}.e30.sig")).unwrap(), "k");
	}

	#[test]
	fn wrong_segment_count_is_malformed() {
		for t in ["", "abc", "a.b", "a.b.c.d", ".b.c", "a..c"] {
			assert!(
				matches!(parse_kid(t), Err(TokenError::Malformed(_))),
				"{t:?} should be malformed"
			);
		}
	}

	#[test]
	fn undecodable_header_is_malformed() {
		assert!(matches!(parse_kid("!!!.e30.sig"), Err(TokenError::Malformed(_))));
		let t = format!("{}.e30.sig", encode("not json"));
		assert!(matches!(parse_kid(&t), Err(TokenError::Malformed(_))));
	}

	#[test]
	fn header_without_kid() {
		let t = token(r#"{"alg":"RS256"}"#, "{}");
		assert!(matches!(parse_kid(&t), Err(TokenError::MissingKid)));
		let t = token(r#"{"alg":"RS256","kid":""}"#, "{}");
		assert!(matches!(parse_kid(&t), Err(TokenError::MissingKid)));
	}

	#[test]
	fn decodes_claims_without_signature() {
		let t = token(
			r#"{"alg":"RS256","kid":"k"}"#,
			r#"{"mac":"aabbcc","capabilities":["x"]}"#,
		);
		let claims = decode_claims_unverified(&t).unwrap();
		assert_eq!(claims.mac, "aabbcc");
		assert_eq!(claims.capabilities, vec!["x"]);
	}

	#[test]
	fn bad_payload_is_malformed() {
		let t = format!("{}.%%%.sig", encode(r#"{"kid":"k"}"#));
		assert!(matches!(
			decode_claims_unverified(&t),
			Err(TokenError::Malformed(_))
		));
	}
}
