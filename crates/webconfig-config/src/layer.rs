// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::sections::{CodecConfigLayer, JwksConfigLayer, LoggingConfigLayer, TokenConfigLayer};

/// One source's view of the configuration. Every field is optional so that
/// layers can be merged by precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SecurityConfigLayer {
	pub codec: Option<CodecConfigLayer>,
	pub token: Option<TokenConfigLayer>,
	pub jwks: Option<JwksConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
}

impl SecurityConfigLayer {
	/// Merges `other` on top of this layer.
	pub fn merge(&mut self, other: SecurityConfigLayer) {
		merge_section(&mut self.codec, other.codec, CodecConfigLayer::merge);
		merge_section(&mut self.token, other.token, TokenConfigLayer::merge);
		merge_section(&mut self.jwks, other.jwks, JwksConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

pub(crate) fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(current), Some(other)) => merge(current, other),
		(None, Some(other)) => *base = Some(other),
		(_, None) => {}
	}
}
