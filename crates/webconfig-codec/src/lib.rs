// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sealed-secret codec for device credentials.
//!
//! Secrets are sealed with AES-CBC under a shared symmetric key. The cipher
//! input is prefixed with a SHA-1 digest of `iv || plaintext` and padded with a
//! `0x80` marker, a framing fixed by the peers that exchange these values.
//!
//! # Example
//!
//! ```
//! use webconfig_codec::{generate_key_base64, SecretCodec};
//!
//! let key = generate_key_base64();
//! let codec = SecretCodec::from_base64_key(Some(&key)).unwrap();
//! let sealed = codec.encrypt("OutOfService").unwrap();
//! assert_eq!(codec.decrypt(&sealed).unwrap(), "OutOfService");
//! ```

pub mod codec;
pub mod error;
pub mod framing;
pub mod key;

pub use codec::SecretCodec;
pub use error::{CodecError, CodecResult};
pub use key::{generate_key_base64, generate_key_base64_with_size, KeySize, SymmetricKey};
