//! Quoting implementation backed by a command-line tool.
//!
//! The tool is usually a node script (`node psm-tool.js`). It receives the
//! network descriptor as JSON after `--net`, followed by the mode flags:
//!
//! - `--contract` prints the contract's board id.
//! - `--wantStable <n>` / `--giveStable <n>` with `--boardId <id>` and
//!   `--feePct <fee>` print a signable offer.

use crate::{OfferError, QuoteInterface};
use async_trait::async_trait;
use load_types::{
	run_tool, NetworkDescriptor, OfferDirection, OfferPayload, OfferRequest, ToolCommand,
};
use std::collections::HashMap;

/// Quoting tool invoked as a subprocess.
pub struct CliQuote {
	program: String,
	script: Option<String>,
	env: HashMap<String, String>,
}

impl CliQuote {
	/// Creates a quoting adapter running `program [script]` with the extra `env`.
	pub fn new(
		program: impl Into<String>,
		script: Option<String>,
		env: HashMap<String, String>,
	) -> Self {
		Self {
			program: program.into(),
			script: script.filter(|s| !s.trim().is_empty()),
			env,
		}
	}

	fn command(&self, network: &NetworkDescriptor) -> ToolCommand {
		let mut cmd = ToolCommand::new(&self.program);
		if let Some(script) = &self.script {
			cmd = cmd.arg(script);
		}
		cmd = cmd.arg("--net").arg(network.to_json());
		for (key, value) in &self.env {
			cmd = cmd.env(key, value);
		}
		cmd
	}

	async fn run(&self, cmd: ToolCommand) -> Result<String, OfferError> {
		let output = run_tool(&cmd)
			.await
			.map_err(|e| OfferError::ToolFailed(e.to_string()))?;

		if !output.success {
			tracing::warn!(
				command = %cmd,
				code = ?output.code,
				stdout = %output.stdout,
				stderr = %output.stderr,
				duration_ms = output.duration.as_millis() as u64,
				"Quote tool failed"
			);
			return Err(OfferError::ToolFailed(format!(
				"exit code {:?}: {}",
				output.code,
				output.stderr.trim()
			)));
		}

		Ok(output.stdout)
	}
}

#[async_trait]
impl QuoteInterface for CliQuote {
	async fn board_id(&self, network: &NetworkDescriptor) -> Result<String, OfferError> {
		let cmd = self.command(network).arg("--contract");
		self.run(cmd).await
	}

	async fn build_offer(
		&self,
		network: &NetworkDescriptor,
		request: &OfferRequest,
	) -> Result<OfferPayload, OfferError> {
		let amount_flag = match request.direction {
			OfferDirection::Buy => "--wantStable",
			OfferDirection::Sell => "--giveStable",
		};
		let cmd = self
			.command(network)
			.arg(amount_flag)
			.arg(request.amount.to_string())
			.arg("--boardId")
			.arg(&request.board_id)
			.arg("--feePct")
			.arg(request.fee_pct.to_string());

		let payload = self.run(cmd).await?;
		Ok(OfferPayload(payload.trim_end().to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::os::unix::fs::PermissionsExt;

	fn fake_tool(dir: &std::path::Path, body: &str) -> String {
		let path = dir.join("quote");
		std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
		std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
		path.to_string_lossy().into_owned()
	}

	fn network() -> NetworkDescriptor {
		NetworkDescriptor {
			rpc: "https://ollinet.rpc.agoric.net:443".into(),
			chain_id: "agoricollinet-21".into(),
		}
	}

	fn request(direction: OfferDirection) -> OfferRequest {
		OfferRequest {
			direction,
			amount: 0.01,
			board_id: "board0511".into(),
			fee_pct: 0.011,
		}
	}

	#[tokio::test]
	async fn test_board_mode_passes_descriptor() {
		let dir = tempfile::tempdir().unwrap();
		// Answers only the contract query, echoing the descriptor back.
		let program = fake_tool(
			dir.path(),
			r#"[ "$3" = "--contract" ] || { echo "unknown option $3" 1>&2; exit 1; }
echo "board0511 $2""#,
		);

		let quote = CliQuote::new(program, None, HashMap::new());
		let out = quote.board_id(&network()).await.unwrap();
		assert!(out.starts_with("board0511 "));
		assert!(out.contains(r#""chainId":"agoricollinet-21""#));
	}

	#[tokio::test]
	async fn test_script_precedes_arguments() {
		let dir = tempfile::tempdir().unwrap();
		let program = fake_tool(dir.path(), r#"echo "$1 $2 $4""#);

		let quote = CliQuote::new(program, Some("psm-tool.js".into()), HashMap::new());
		let out = quote.board_id(&network()).await.unwrap();
		assert_eq!(out.trim(), "psm-tool.js --net --contract");
	}

	#[tokio::test]
	async fn test_buy_arguments_and_env() {
		let dir = tempfile::tempdir().unwrap();
		let program = fake_tool(dir.path(), r#"echo "$3 $4 $5 $6 $7 $8 $NODE_NO_WARNINGS""#);

		let quote = CliQuote::new(
			program,
			None,
			HashMap::from([("NODE_NO_WARNINGS".to_string(), "1".to_string())]),
		);
		let offer = quote
			.build_offer(&network(), &request(OfferDirection::Buy))
			.await
			.unwrap();
		assert_eq!(
			offer.as_str(),
			"--wantStable 0.01 --boardId board0511 --feePct 0.011 1"
		);
	}

	#[tokio::test]
	async fn test_sell_gives_stable() {
		let dir = tempfile::tempdir().unwrap();
		let program = fake_tool(dir.path(), r#"echo "$3 $4""#);

		let quote = CliQuote::new(program, None, HashMap::new());
		let offer = quote
			.build_offer(&network(), &request(OfferDirection::Sell))
			.await
			.unwrap();
		assert_eq!(offer.as_str(), "--giveStable 0.01");
	}

	#[tokio::test]
	async fn test_tool_failure() {
		let dir = tempfile::tempdir().unwrap();
		let program = fake_tool(dir.path(), "echo 'no quote' 1>&2; exit 2");

		let quote = CliQuote::new(program, None, HashMap::new());
		let result = quote
			.build_offer(&network(), &request(OfferDirection::Sell))
			.await;
		assert!(matches!(result, Err(OfferError::ToolFailed(ref m)) if m.contains("no quote")));
	}
}
