//! Worker cycle types.
//!
//! A cycle is one pass of a worker through offer construction, broadcast and
//! confirmation. Cycles are never persisted; each produces a [`CycleReport`]
//! that is logged and published on the event bus.

use crate::{OfferDirection, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stage of the cycle at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
	/// Building the offer with the quoting tool.
	Offer,
	/// Resolving the chain id before the first broadcast.
	ChainContext,
	/// Signing and submitting the offer.
	Broadcast,
	/// Polling for the transaction result.
	Confirmation,
}

impl fmt::Display for CycleStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			CycleStage::Offer => "offer",
			CycleStage::ChainContext => "chain_context",
			CycleStage::Broadcast => "broadcast",
			CycleStage::Confirmation => "confirmation",
		};
		f.write_str(name)
	}
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleOutcome {
	/// Offer built, broadcast and executed with result code 0.
	Completed { tx_hash: TxHash },
	/// Broadcast succeeded but the tool printed no hash.
	NothingToConfirm,
	/// Confirmation polling ran out of attempts.
	TimedOut { tx_hash: TxHash },
	/// The transaction was included but rejected by the chain.
	Rejected {
		tx_hash: TxHash,
		code: u32,
		raw_log: String,
	},
	/// The cycle was abandoned at `stage`.
	Failed { stage: CycleStage, error: String },
}

impl CycleOutcome {
	/// Whether the cycle completed successfully.
	pub fn is_completed(&self) -> bool {
		matches!(self, CycleOutcome::Completed { .. })
	}

	/// Whether the next cycle should be delayed by the failure backoff.
	pub fn is_failure(&self) -> bool {
		matches!(
			self,
			CycleOutcome::Rejected { .. } | CycleOutcome::Failed { .. }
		)
	}

	/// Hash of the transaction the cycle submitted, if any.
	pub fn tx_hash(&self) -> Option<&TxHash> {
		match self {
			CycleOutcome::Completed { tx_hash }
			| CycleOutcome::TimedOut { tx_hash }
			| CycleOutcome::Rejected { tx_hash, .. } => Some(tx_hash),
			CycleOutcome::NothingToConfirm | CycleOutcome::Failed { .. } => None,
		}
	}

	/// Short label used as a log field.
	pub fn label(&self) -> &'static str {
		match self {
			CycleOutcome::Completed { .. } => "completed",
			CycleOutcome::NothingToConfirm => "nothing_to_confirm",
			CycleOutcome::TimedOut { .. } => "timed_out",
			CycleOutcome::Rejected { .. } => "rejected",
			CycleOutcome::Failed { .. } => "failed",
		}
	}
}

/// Record of one finished cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
	/// Worker (and identity) index.
	pub worker: usize,
	/// Sequence number of the cycle within the worker, starting at 0.
	pub cycle: u64,
	/// Direction of the offer attempted.
	pub direction: OfferDirection,
	/// Wall-clock start of the cycle.
	pub started_at: DateTime<Utc>,
	/// Time from cycle start to outcome.
	pub duration: Duration,
	/// How the cycle ended.
	pub outcome: CycleOutcome,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_outcome_classification() {
		let hash = TxHash("ABC".into());
		assert!(CycleOutcome::Completed {
			tx_hash: hash.clone()
		}
		.is_completed());
		assert!(!CycleOutcome::TimedOut {
			tx_hash: hash.clone()
		}
		.is_failure());
		assert!(CycleOutcome::Rejected {
			tx_hash: hash,
			code: 5,
			raw_log: String::new()
		}
		.is_failure());
		assert!(CycleOutcome::Failed {
			stage: CycleStage::Offer,
			error: "boom".into()
		}
		.is_failure());
		assert!(!CycleOutcome::NothingToConfirm.is_failure());
	}
}
