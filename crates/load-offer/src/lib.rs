//! Offer construction module for the psmload system.
//!
//! Offers are produced by an external quoting tool that knows the contract's
//! terms. This module defines the interface to that tool and the
//! [`OfferService`] that validates its board-resolution output.

use async_trait::async_trait;
use load_types::{NetworkDescriptor, OfferPayload, OfferRequest};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod cli;
}

/// Prefix every board id carries.
pub const BOARD_ID_PREFIX: &str = "board";

/// Errors that can occur during offer operations.
#[derive(Debug, Error)]
pub enum OfferError {
	/// The quoting tool could not be run or exited with an error.
	#[error("Quote tool failed: {0}")]
	ToolFailed(String),
	/// The board-resolution output is not a board id.
	#[error("Cannot resolve contract id: got '{0}'")]
	InvalidBoardId(String),
}

/// Trait defining the interface for offer quoting implementations.
#[async_trait]
pub trait QuoteInterface: Send + Sync {
	/// Asks the tool for the contract's board id and returns its raw answer.
	async fn board_id(&self, network: &NetworkDescriptor) -> Result<String, OfferError>;

	/// Builds a signable offer for `request`.
	async fn build_offer(
		&self,
		network: &NetworkDescriptor,
		request: &OfferRequest,
	) -> Result<OfferPayload, OfferError>;
}

/// Service that builds offers through a quoting implementation.
pub struct OfferService {
	implementation: Box<dyn QuoteInterface>,
}

impl OfferService {
	/// Creates a new OfferService with the specified implementation.
	pub fn new(implementation: Box<dyn QuoteInterface>) -> Self {
		Self { implementation }
	}

	/// Resolves the board id of the target contract.
	///
	/// The answer is accepted only if it starts with `board`; anything else
	/// means the contract cannot be addressed and the run must not start.
	pub async fn resolve_board_id(&self, network: &NetworkDescriptor) -> Result<String, OfferError> {
		let raw = self.implementation.board_id(network).await?;
		let board_id = raw.trim();
		if !board_id.starts_with(BOARD_ID_PREFIX) {
			tracing::error!(output = %board_id, "Quote tool returned no board id");
			return Err(OfferError::InvalidBoardId(board_id.to_string()));
		}
		Ok(board_id.to_string())
	}

	/// Builds an offer payload for `request`.
	pub async fn build(
		&self,
		network: &NetworkDescriptor,
		request: &OfferRequest,
	) -> Result<OfferPayload, OfferError> {
		self.implementation.build_offer(network, request).await
	}
}
