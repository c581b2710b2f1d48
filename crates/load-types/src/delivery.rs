//! Transaction delivery types for the load generator.
//!
//! This module defines types related to transaction submission and
//! confirmation polling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction hash as printed by the ledger tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl TxHash {
	/// Returns the hash text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for TxHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Execution result of a transaction included on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
	/// The hash of the transaction.
	pub hash: TxHash,
	/// ABCI result code; `0` means the transaction executed successfully.
	pub code: u32,
	/// Raw execution log.
	pub raw_log: String,
}

impl TxResult {
	/// Whether the chain accepted the transaction.
	pub fn is_success(&self) -> bool {
		self.code == 0
	}
}

/// Status of a transaction as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
	/// Not indexed yet.
	Pending,
	/// Included in a block with the given result.
	Included(TxResult),
}

/// Outcome of confirmation polling that did not end in rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
	/// Included with result code 0.
	Success(TxResult),
	/// The attempt budget ran out before any result was observed.
	TimedOut {
		/// Number of status requests issued.
		attempts: u32,
	},
}
