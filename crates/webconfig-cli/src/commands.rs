// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use tracing::{info, instrument};
use webconfig_codec::{generate_key_base64_with_size, KeySize};
use webconfig_config::SecurityConfig;
use webconfig_jwks::{HttpKeySetFetcher, KeySetFetcher};
use webconfig_token::{parse_kid, IssueRequest, TokenClass};

use crate::bootstrap::{build_codec, SecurityServices};

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
	/// Issue a token bound to a device
	Issue(IssueArgs),
	/// Verify a token and print its claims as JSON
	Verify(VerifyArgs),
	/// Print the kid from a token header without verifying it
	Kid { token: String },
}

#[derive(Debug, Clone, Args)]
pub struct IssueArgs {
	/// Device MAC address the token is bound to
	#[arg(long)]
	pub mac: String,

	/// Lifetime in seconds (defaults to token.default_ttl_secs)
	#[arg(long)]
	pub ttl_secs: Option<u64>,

	#[arg(long)]
	pub serial: Option<String>,

	#[arg(long)]
	pub partner_id: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
	pub token: String,

	#[arg(long, value_enum, default_value_t = ClassArg::Device)]
	pub class: ClassArg,

	/// Require the token to be bound to this MAC address
	#[arg(long)]
	pub mac: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum JwksCommand {
	/// Fetch the configured key set once and print its kids
	Fetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassArg {
	Api,
	Device,
}

impl From<ClassArg> for TokenClass {
	fn from(class: ClassArg) -> Self {
		match class {
			ClassArg::Api => TokenClass::Api,
			ClassArg::Device => TokenClass::Device,
		}
	}
}

pub fn gen_key(size: usize) -> anyhow::Result<()> {
	let size = KeySize::from_len(size).context("unsupported key size")?;
	println!("{}", generate_key_base64_with_size(size));
	Ok(())
}

#[instrument(skip_all)]
pub fn encrypt(config: &SecurityConfig, plaintext: &str) -> anyhow::Result<()> {
	let codec = build_codec(&config.codec)?;
	println!("{}", codec.encrypt(plaintext)?);
	Ok(())
}

#[instrument(skip_all)]
pub fn decrypt(config: &SecurityConfig, sealed: &str) -> anyhow::Result<()> {
	let codec = build_codec(&config.codec)?;
	println!("{}", codec.decrypt(sealed).context("failed to open sealed secret")?);
	Ok(())
}

pub fn token_kid(token: &str) -> anyhow::Result<()> {
	println!("{}", parse_kid(token)?);
	Ok(())
}

async fn with_services<F>(config: &SecurityConfig, f: F) -> anyhow::Result<()>
where
	F: FnOnce(&SecurityServices) -> anyhow::Result<()>,
{
	let services = SecurityServices::start(config).await?;
	let result = f(&services);
	services.shutdown();
	result
}

pub async fn token_issue(config: &SecurityConfig, args: IssueArgs) -> anyhow::Result<()> {
	let ttl = Duration::from_secs(args.ttl_secs.unwrap_or(config.token.default_ttl_secs));
	let mut request = IssueRequest::new(args.mac, ttl);
	if let Some(serial) = args.serial {
		request = request.with_serial(serial);
	}
	if let Some(partner_id) = args.partner_id {
		request = request.with_partner_id(partner_id);
	}

	with_services(config, |services| {
		let token = services.authority.try_generate_with(&request)?;
		println!("{token}");
		Ok(())
	})
	.await
}

pub async fn token_verify(config: &SecurityConfig, args: VerifyArgs) -> anyhow::Result<()> {
	with_services(config, |services| {
		let claims = services
			.authority
			.verify(&args.token, args.class.into(), args.mac.as_deref())
			.map_err(|e| anyhow::anyhow!("token rejected ({}): {e}", e.category()))?;
		println!("{}", serde_json::to_string_pretty(&claims)?);
		Ok(())
	})
	.await
}

pub async fn jwks_fetch(config: &SecurityConfig) -> anyhow::Result<()> {
	let jwks = config
		.jwks
		.as_ref()
		.context("no key set configured, set jwks.uri")?;
	let fetcher = HttpKeySetFetcher::new(jwks.uri.clone(), Duration::from_secs(jwks.timeout_secs))?;
	let keys = fetcher.fetch().await?;
	info!(uri = %jwks.uri, keys = keys.len(), "fetched key set");
	for kid in keys.kids() {
		println!("{kid}");
	}
	Ok(())
}
