// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret loading from environment variables with `*_FILE` indirection.

use std::path::PathBuf;

use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("{var} points at {}, which could not be read: {source}", path.display())]
	FileRead {
		var: String,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Load a secret from `NAME_FILE` (a path whose contents are the secret) or
/// `NAME`. The file variant wins when both are set. Empty values count as
/// unset.
pub fn load_secret_env(name: &str) -> Result<Option<Zeroizing<String>>, SecretEnvError> {
	load_secret_with(name, |var| std::env::var(var).ok())
}

/// [`load_secret_env`] against an arbitrary variable lookup.
pub fn load_secret_with<F>(name: &str, lookup: F) -> Result<Option<Zeroizing<String>>, SecretEnvError>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{name}_FILE");
	if let Some(path) = lookup(&file_var).filter(|p| !p.trim().is_empty()) {
		let path = PathBuf::from(path.trim());
		let content = std::fs::read_to_string(&path).map_err(|source| SecretEnvError::FileRead {
			var: file_var,
			path,
			source,
		})?;
		let content = Zeroizing::new(content);
		let value = content.trim_end_matches(['\r', '\n']);
		return Ok((!value.is_empty()).then(|| Zeroizing::new(value.to_string())));
	}

	Ok(lookup(name)
		.filter(|v| !v.is_empty())
		.map(Zeroizing::new))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| map.get(name).cloned()
	}

	#[test]
	fn reads_plain_variable() {
		let value = load_secret_with("KEY", lookup(&[("KEY", "abc")])).unwrap();
		assert_eq!(value.as_deref().map(String::as_str), Some("abc"));
	}

	#[test]
	fn unset_and_empty_are_none() {
		assert!(load_secret_with("KEY", lookup(&[])).unwrap().is_none());
		assert!(load_secret_with("KEY", lookup(&[("KEY", "")])).unwrap().is_none());
	}

	#[test]
	fn file_variant_wins_and_is_trimmed() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();
		let path = file.path().to_string_lossy().to_string();

		let value = load_secret_with(
			"KEY",
			lookup(&[("KEY", "from-env"), ("KEY_FILE", path.as_str())]),
		)
		.unwrap();
		assert_eq!(value.as_deref().map(String::as_str), Some("from-file"));
	}

	#[test]
	fn unreadable_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("nope").to_string_lossy().to_string();
		let err = load_secret_with("KEY", lookup(&[("KEY_FILE", missing.as_str())])).unwrap_err();
		assert!(err.to_string().contains("KEY_FILE"));
	}
}
