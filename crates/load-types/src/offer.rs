//! Offer types for the load generator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signable offer produced by the quoting tool.
///
/// The payload is opaque to the load generator and handed to the ledger
/// tool verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferPayload(pub String);

impl OfferPayload {
	/// Returns the raw payload text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

/// Side of the swap a cycle performs against the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferDirection {
	/// Receive the stable asset.
	Buy,
	/// Give the stable asset.
	Sell,
}

impl OfferDirection {
	/// Returns the opposite direction.
	pub fn flip(self) -> Self {
		match self {
			OfferDirection::Buy => OfferDirection::Sell,
			OfferDirection::Sell => OfferDirection::Buy,
		}
	}
}

impl fmt::Display for OfferDirection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OfferDirection::Buy => write!(f, "buy"),
			OfferDirection::Sell => write!(f, "sell"),
		}
	}
}

/// Parameters of a single offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRequest {
	/// Swap direction.
	pub direction: OfferDirection,
	/// Stable-asset amount in whole units.
	pub amount: f64,
	/// Board id of the target contract.
	pub board_id: String,
	/// Fee percentage to pay, e.g. `0.011`.
	pub fee_pct: f64,
}
