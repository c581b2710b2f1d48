//! Transaction delivery module for the psmload system.
//!
//! This module handles signing and submission of offers through the ledger
//! tool and the subsequent polling for their on-chain result. It also owns
//! the lookup of the chain id, which the ledger tool needs on every broadcast.

use async_trait::async_trait;
use load_types::{Identity, OfferPayload, TxHash, TxStatus};
use thiserror::Error;

pub mod broadcaster;
pub mod confirmation;

/// Re-export implementations
pub mod implementations {
	pub mod agd;
	pub mod rest;
	pub mod status_page;
}

pub use broadcaster::{BroadcastPolicy, Broadcaster};
pub use confirmation::ConfirmationPoller;

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// A response arrived but could not be interpreted.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// The ledger tool did not accept the offer.
	#[error("Broadcast failed: {0}")]
	BroadcastFailed(String),
	/// The transaction was included with a non-zero result code.
	#[error("Transaction {hash} rejected with code {code}: {raw_log}")]
	TransactionRejected {
		hash: TxHash,
		code: u32,
		raw_log: String,
	},
	/// The chain id could not be determined.
	#[error("Chain id unavailable: {0}")]
	ChainIdUnavailable(String),
}

/// Errors reported by ledger tool implementations.
#[derive(Debug, Error)]
pub enum LedgerError {
	/// The signing key is missing from the keystore or unknown to the chain.
	#[error("Key not found: {key_name}")]
	KeyNotFound { key_name: String },
	/// The tool exited unsuccessfully.
	#[error("Ledger tool exited with code {code:?}")]
	Failed {
		code: Option<i32>,
		stdout: String,
		stderr: String,
	},
	/// The tool could not be run at all.
	#[error("Ledger tool could not run: {0}")]
	Tool(String),
}

/// Everything the ledger tool needs to sign and submit one offer.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastRequest<'a> {
	/// Identity whose key signs the offer.
	pub identity: &'a Identity,
	/// Chain id of the target network.
	pub chain_id: &'a str,
	/// RPC endpoint the tool submits to.
	pub rpc: &'a str,
	/// The offer to submit.
	pub offer: &'a OfferPayload,
}

/// Trait defining the interface for ledger signing/broadcast implementations.
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Signs and submits the offer in `request`.
	///
	/// Returns the transaction hash if the tool reported one.
	async fn sign_and_broadcast(
		&self,
		request: &BroadcastRequest<'_>,
	) -> Result<Option<TxHash>, LedgerError>;
}

/// Trait defining the interface for transaction status lookups.
#[async_trait]
pub trait TxStatusInterface: Send + Sync {
	/// Returns the current status of the transaction `hash`.
	///
	/// Errors are treated as transient by the poller.
	async fn get_status(&self, hash: &TxHash) -> Result<TxStatus, DeliveryError>;
}

/// Trait defining the interface for chain metadata lookups.
#[async_trait]
pub trait ChainInfoInterface: Send + Sync {
	/// Fetches the chain id of the target network.
	async fn fetch_chain_id(&self) -> Result<String, DeliveryError>;
}
