// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod codec;
mod jwks;
mod logging;
mod token;

pub use codec::{CodecConfig, CodecConfigLayer};
pub use jwks::{
	JwksConfig, JwksConfigLayer, DEFAULT_MIN_REFRESH_INTERVAL_SECS, DEFAULT_REFRESH_INTERVAL_SECS,
	DEFAULT_TIMEOUT_SECS,
};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use token::{
	ClassPolicyConfig, ClassPolicyConfigLayer, IssuanceConfigLayer, TokenConfig, TokenConfigLayer,
	VerifierSetting, DEFAULT_SIGNING_KID, DEFAULT_TTL_SECS,
};
