// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator CLI for webconfig sealed secrets and device tokens.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use webconfig_config::{LogFormat, LoggingConfig, SecurityConfig};

mod bootstrap;
mod commands;
mod logging;

use commands::{JwksCommand, TokenCommand};

/// webconfig-security - seal secrets and manage device tokens.
#[derive(Parser, Debug)]
#[command(
	name = "webconfig-security",
	about = "Seal secrets and issue or verify device tokens",
	version
)]
struct Args {
	/// Config file (defaults to /etc/webconfig/security.toml)
	#[arg(long, global = true, env = "WEBCONFIG_CONFIG")]
	config: Option<PathBuf>,

	/// Log output format, overriding the configured one
	#[arg(long, global = true)]
	log_format: Option<LogFormat>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print a fresh base64 AES key
	GenKey {
		/// Key length in bytes: 16, 24 or 32
		#[arg(long, default_value_t = 32)]
		size: usize,
	},
	/// Seal a plaintext with the configured codec key
	Encrypt { plaintext: String },
	/// Open a sealed secret with the configured codec key
	Decrypt { sealed: String },
	/// Issue, verify and inspect device tokens
	#[command(subcommand)]
	Token(TokenCommand),
	/// Inspect the configured remote key set
	#[command(subcommand)]
	Jwks(JwksCommand),
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SecurityConfig> {
	let config = match path {
		Some(path) => webconfig_config::load_config_with_file(path.clone())
			.with_context(|| format!("failed to load configuration from {}", path.display()))?,
		None => webconfig_config::load_config().context("failed to load configuration")?,
	};
	Ok(config)
}

/// Load configuration and install logging from it.
fn configure(path: Option<&PathBuf>, log_format: Option<LogFormat>) -> anyhow::Result<SecurityConfig> {
	let config = load_config(path)?;
	logging::init(&config.logging, log_format);
	Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let Args {
		config,
		log_format,
		command,
	} = Args::parse();

	match command {
		Command::GenKey { size } => {
			logging::init(&LoggingConfig::default(), log_format);
			commands::gen_key(size)
		}
		Command::Token(TokenCommand::Kid { token }) => {
			logging::init(&LoggingConfig::default(), log_format);
			commands::token_kid(&token)
		}
		Command::Encrypt { plaintext } => {
			let config = configure(config.as_ref(), log_format)?;
			commands::encrypt(&config, &plaintext)
		}
		Command::Decrypt { sealed } => {
			let config = configure(config.as_ref(), log_format)?;
			commands::decrypt(&config, &sealed)
		}
		Command::Token(TokenCommand::Issue(issue)) => {
			let config = configure(config.as_ref(), log_format)?;
			commands::token_issue(&config, issue).await
		}
		Command::Token(TokenCommand::Verify(verify)) => {
			let config = configure(config.as_ref(), log_format)?;
			commands::token_verify(&config, verify).await
		}
		Command::Jwks(JwksCommand::Fetch) => {
			let config = configure(config.as_ref(), log_format)?;
			commands::jwks_fetch(&config).await
		}
	}
}
