//! Keyring implementation backed by the chain daemon CLI.
//!
//! Keys are created with `agd keys add` in a `test` keyring so that signing
//! never prompts. When a state directory is configured and the key already
//! exists there, the existing address is reused instead.

use crate::{AccountError, KeyringInterface};
use async_trait::async_trait;
use load_types::{capture, run_tool, ToolCommand};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

static ADDRESS_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"address: (agoric1\S+)").expect("valid address pattern"));

static BARE_ADDRESS_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?m)^\s*(agoric1\S+)\s*$").expect("valid address pattern"));

/// Extracts the address from `keys add` output.
///
/// Pure and deterministic: the same output always yields the same address.
pub fn parse_address(output: &str) -> Option<String> {
	capture(&ADDRESS_PATTERN, output)
}

/// Keyring that shells out to `agd keys`.
pub struct AgdKeyring {
	program: String,
	keyring_backend: String,
	home: Option<PathBuf>,
}

impl AgdKeyring {
	/// Creates a keyring using `program` with the given backend and keystore home.
	pub fn new(
		program: impl Into<String>,
		keyring_backend: impl Into<String>,
		home: Option<PathBuf>,
	) -> Self {
		Self {
			program: program.into(),
			keyring_backend: keyring_backend.into(),
			home,
		}
	}

	fn keys_command(&self, args: &[&str]) -> ToolCommand {
		let mut cmd = ToolCommand::new(&self.program)
			.arg("keys")
			.args(args.iter().copied())
			.arg("--keyring-backend")
			.arg(&self.keyring_backend);
		if let Some(home) = &self.home {
			cmd = cmd.arg("--home").arg(home);
		}
		cmd
	}

	/// Looks up an existing key in the state directory.
	async fn existing_address(&self, key_name: &str) -> Option<String> {
		self.home.as_ref()?;
		let output = run_tool(&self.keys_command(&["show", key_name, "-a"]))
			.await
			.ok()?;
		if !output.success {
			return None;
		}
		capture(&BARE_ADDRESS_PATTERN, &output.stdout)
	}
}

#[async_trait]
impl KeyringInterface for AgdKeyring {
	async fn create_identity(&self, key_name: &str) -> Result<String, AccountError> {
		if let Some(address) = self.existing_address(key_name).await {
			tracing::debug!(key = %key_name, address = %address, "Reusing existing key");
			return Ok(address);
		}

		let cmd = self.keys_command(&["add", key_name]);
		let output = run_tool(&cmd).await.map_err(|e| AccountError::ToolFailed {
			key_name: key_name.to_string(),
			message: e.to_string(),
		})?;

		if !output.success {
			tracing::error!(
				command = %cmd,
				code = ?output.code,
				stdout = %output.stdout,
				stderr = %output.stderr,
				"Key creation failed"
			);
			return Err(AccountError::ToolFailed {
				key_name: key_name.to_string(),
				message: format!("exit code {:?}: {}", output.code, output.stderr.trim()),
			});
		}

		// Depending on the SDK version the key info goes to stdout or stderr.
		let combined = format!("{}\n{}", output.stdout, output.stderr);
		parse_address(&combined).ok_or_else(|| AccountError::AddressNotFound {
			key_name: key_name.to_string(),
		})
	}
}
