// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Digest and padding framing for sealed secrets.
//!
//! The cipher input is `SHA1(iv || plaintext) || plaintext`, right-padded to
//! the block size with a `0x80` marker followed by zero bytes. Unpadding strips
//! every trailing `0x00`/`0x80`, so the last plaintext byte must be neither.

use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Size of the CBC initialisation vector in bytes.
pub const IV_SIZE: usize = 16;

/// Size of the SHA-1 digest prefix in bytes.
pub const DIGEST_SIZE: usize = 20;

const PAD_MARKER: u8 = 0x80;
const PAD_FILL: u8 = 0x00;

/// Compute the integrity digest over `iv || plaintext`.
pub fn digest(iv: &[u8], plaintext: &[u8]) -> [u8; DIGEST_SIZE] {
	let mut hasher = Sha1::new();
	hasher.update(iv);
	hasher.update(plaintext);
	hasher.finalize().into()
}

/// Returns true if `byte` would be consumed by [`unpad`].
pub fn is_padding_byte(byte: u8) -> bool {
	byte == PAD_MARKER || byte == PAD_FILL
}

/// Build the unpadded cipher input `digest || plaintext`.
pub fn frame(iv: &[u8], plaintext: &[u8]) -> Zeroizing<Vec<u8>> {
	let mut body = Zeroizing::new(Vec::with_capacity(DIGEST_SIZE + plaintext.len() + BLOCK_SIZE));
	body.extend_from_slice(&digest(iv, plaintext));
	body.extend_from_slice(plaintext);
	body
}

/// Number of padding bytes needed to reach a whole block.
pub fn pad_len(len: usize) -> usize {
	(BLOCK_SIZE - len % BLOCK_SIZE) % BLOCK_SIZE
}

/// Right-pad `buf` in place to a multiple of [`BLOCK_SIZE`].
pub fn pad(buf: &mut Vec<u8>) {
	let gap = pad_len(buf.len());
	if gap == 0 {
		return;
	}
	buf.push(PAD_MARKER);
	buf.resize(buf.len() + gap - 1, PAD_FILL);
}

/// Strip trailing padding bytes.
pub fn unpad(buf: &[u8]) -> &[u8] {
	let end = buf
		.iter()
		.rposition(|&b| !is_padding_byte(b))
		.map_or(0, |idx| idx + 1);
	&buf[..end]
}

/// Finds the plaintext byte that [`unpad`] wrongly stripped from a peer-sealed
/// body whose plaintext ended in a padding byte.
///
/// `padded` is the decrypted `digest || plaintext || padding` and `kept` the
/// length [`unpad`] returned. Returns the last byte of the shortest extension
/// whose digest matches.
pub fn stripped_trailing_byte(iv: &[u8], padded: &[u8], kept: usize) -> Option<u8> {
	if kept < DIGEST_SIZE || kept > padded.len() {
		return None;
	}
	let (expected, _) = padded.split_at(DIGEST_SIZE);
	(kept + 1..=padded.len())
		.find(|&end| digest(iv, &padded[DIGEST_SIZE..end]).as_slice() == expected)
		.map(|end| padded[end - 1])
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn aligned_input_gets_no_padding() {
		let mut buf = vec![1u8; 32];
		pad(&mut buf);
		assert_eq!(buf.len(), 32);
	}

	#[test]
	fn gap_of_one_appends_only_marker() {
		let mut buf = vec![1u8; 15];
		pad(&mut buf);
		assert_eq!(buf.len(), 16);
		assert_eq!(buf[15], 0x80);
	}

	#[test]
	fn larger_gap_appends_marker_then_zeros() {
		let mut buf = vec![1u8; 21];
		pad(&mut buf);
		assert_eq!(buf.len(), 32);
		assert_eq!(buf[21], 0x80);
		assert!(buf[22..].iter().all(|&b| b == 0));
	}

	#[test]
	fn unpad_strips_mixed_trailing_bytes() {
		let buf = [b'a', b'b', 0x80, 0x00, 0x80, 0x00];
		assert_eq!(unpad(&buf), b"ab");
	}

	#[test]
	fn unpad_of_all_padding_is_empty() {
		assert!(unpad(&[0x80, 0, 0, 0]).is_empty());
		assert!(unpad(&[]).is_empty());
	}

	#[test]
	fn frame_starts_with_digest() {
		let iv = [9u8; IV_SIZE];
		let body = frame(&iv, b"OutOfService");
		assert_eq!(&body[..DIGEST_SIZE], &digest(&iv, b"OutOfService"));
		assert_eq!(&body[DIGEST_SIZE..], b"OutOfService");
	}

	#[test]
	fn digest_depends_on_iv() {
		assert_ne!(digest(&[0u8; 16], b"x"), digest(&[1u8; 16], b"x"));
	}

	proptest! {
		#[test]
		fn prop_padded_length_is_block_multiple(len in 0usize..200) {
			let mut buf = vec![0x41u8; len];
			pad(&mut buf);
			prop_assert_eq!(buf.len() % BLOCK_SIZE, 0);
			prop_assert!(buf.len() >= len);
			prop_assert!(buf.len() - len < BLOCK_SIZE);
		}

		#[test]
		fn prop_unpad_inverts_pad_for_unambiguous_tail(
			mut data in proptest::collection::vec(any::<u8>(), 1..200),
		) {
			prop_assume!(!is_padding_byte(*data.last().unwrap()));
			let original = data.clone();
			pad(&mut data);
			prop_assert_eq!(unpad(&data), original.as_slice());
		}
	}
}
