//! Ledger implementation backed by the chain daemon CLI.
//!
//! Offers are submitted as smart-wallet actions:
//!
//! ```text
//! agd tx swingset wallet-action --allow-spend <offer> --from <key>
//!     --keyring-backend test [--home <dir>] --chain-id <id> --node <rpc>
//!     --broadcast-mode sync --yes
//! ```

use crate::{BroadcastRequest, LedgerError, LedgerInterface};
use async_trait::async_trait;
use load_types::{capture, run_tool, ToolCommand, TxHash};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

static TXHASH_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?m)txhash: (.+?)$").expect("valid txhash pattern"));

/// Marker the daemon prints when the signing key is missing.
const KEY_NOT_FOUND: &str = "key not found";

/// Extracts the transaction hash from broadcast output.
pub fn parse_tx_hash(output: &str) -> Option<TxHash> {
	capture(&TXHASH_PATTERN, output).map(TxHash)
}

/// Ledger that shells out to `agd tx`.
pub struct AgdLedger {
	program: String,
	keyring_backend: String,
	home: Option<PathBuf>,
}

impl AgdLedger {
	/// Creates a ledger using `program` with the given backend and keystore home.
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

	fn command(&self, request: &BroadcastRequest<'_>) -> ToolCommand {
		let mut cmd = ToolCommand::new(&self.program)
			.args(["tx", "swingset", "wallet-action"])
			.arg("--allow-spend")
			.arg(request.offer.as_str())
			.arg("--from")
			.arg(&request.identity.key_name)
			.arg("--keyring-backend")
			.arg(&self.keyring_backend);
		if let Some(home) = &self.home {
			cmd = cmd.arg("--home").arg(home);
		}
		cmd.arg("--chain-id")
			.arg(request.chain_id)
			.arg("--node")
			.arg(request.rpc)
			.args(["--broadcast-mode", "sync", "--yes"])
	}
}

#[async_trait]
impl LedgerInterface for AgdLedger {
	async fn sign_and_broadcast(
		&self,
		request: &BroadcastRequest<'_>,
	) -> Result<Option<TxHash>, LedgerError> {
		let output = run_tool(&self.command(request))
			.await
			.map_err(|e| LedgerError::Tool(e.to_string()))?;

		if !output.success {
			if output.stderr.contains(KEY_NOT_FOUND) {
				return Err(LedgerError::KeyNotFound {
					key_name: request.identity.key_name.clone(),
				});
			}
			return Err(LedgerError::Failed {
				code: output.code,
				stdout: output.stdout,
				stderr: output.stderr,
			});
		}

		Ok(parse_tx_hash(&output.stdout))
	}
}
