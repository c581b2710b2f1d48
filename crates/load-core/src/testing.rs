//! In-memory capability implementations for engine tests.

use crate::builder::LoadComponents;
use async_trait::async_trait;
use load_account::{AccountError, KeyringInterface};
use load_delivery::{
	BroadcastRequest, ChainInfoInterface, DeliveryError, LedgerError, LedgerInterface,
	TxStatusInterface,
};
use load_offer::{OfferError, QuoteInterface};
use load_provision::{FaucetInterface, ProvisionError};
use load_types::{
	key_name_for, NetworkDescriptor, OfferPayload, OfferRequest, TxHash, TxResult, TxStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Time the fake quoting tool takes to build an offer.
pub(crate) const QUOTE_LATENCY: Duration = Duration::from_millis(100);

/// Chain id reported by the fake status page.
pub(crate) const CHAIN_ID: &str = "agoricollinet-21";

/// Failure injected into a [`FakeNetwork`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Fault {
	#[default]
	None,
	/// Every offer build fails.
	QuoteFails,
	/// Every broadcast reports a missing key.
	KeyNotFound,
	/// Transactions are included with this non-zero code.
	Rejected(u32),
	/// Transactions never show up on the status endpoint.
	NeverIncluded,
	/// The first `failures` chain id lookups fail.
	ChainInfoDown { failures: usize },
}

#[derive(Clone, Default)]
struct Recorder {
	/// `(key_name, offer)` for every broadcast.
	broadcasts: Arc<Mutex<Vec<(String, String)>>>,
	/// Descriptors passed to board resolution.
	board_networks: Arc<Mutex<Vec<NetworkDescriptor>>>,
	polls: Arc<Mutex<HashMap<String, u32>>>,
	faucet_calls: Arc<AtomicUsize>,
	chain_id_lookups: Arc<AtomicUsize>,
}

/// A simulated network whose transactions succeed on the second poll unless
/// a [`Fault`] says otherwise.
pub(crate) struct FakeNetwork {
	board: String,
	fault: Fault,
	recorder: Recorder,
}

impl FakeNetwork {
	pub(crate) fn new(board: &str) -> Self {
		Self::with_fault(board, Fault::None)
	}

	pub(crate) fn with_fault(board: &str, fault: Fault) -> Self {
		Self {
			board: board.to_string(),
			fault,
			recorder: Recorder::default(),
		}
	}

	pub(crate) fn components(&self) -> LoadComponents {
		LoadComponents {
			keyring: Box::new(FakeKeyring),
			quote: Box::new(FakeQuote {
				board: self.board.clone(),
				fault: self.fault,
				recorder: self.recorder.clone(),
			}),
			ledger: Box::new(FakeLedger {
				fault: self.fault,
				recorder: self.recorder.clone(),
			}),
			tx_status: Box::new(FakeTxStatus {
				fault: self.fault,
				recorder: self.recorder.clone(),
			}),
			chain_info: Box::new(FakeChainInfo {
				fault: self.fault,
				recorder: self.recorder.clone(),
			}),
			faucet: Box::new(FakeFaucet {
				recorder: self.recorder.clone(),
			}),
		}
	}

	/// Descriptors board resolution was called with.
	pub(crate) fn board_networks(&self) -> Vec<NetworkDescriptor> {
		self.recorder.board_networks.lock().unwrap().clone()
	}

	/// Offers that were broadcast.
	pub(crate) fn offers(&self) -> Vec<String> {
		self.recorder
			.broadcasts
			.lock()
			.unwrap()
			.iter()
			.map(|(_, offer)| offer.clone())
			.collect()
	}

	/// Keys that signed broadcasts, in order.
	pub(crate) fn signers(&self) -> Vec<String> {
		self.recorder
			.broadcasts
			.lock()
			.unwrap()
			.iter()
			.map(|(key, _)| key.clone())
			.collect()
	}

	pub(crate) fn faucet_calls(&self) -> usize {
		self.recorder.faucet_calls.load(Ordering::SeqCst)
	}

	pub(crate) fn chain_id_lookups(&self) -> usize {
		self.recorder.chain_id_lookups.load(Ordering::SeqCst)
	}
}

struct FakeKeyring;

#[async_trait]
impl KeyringInterface for FakeKeyring {
	async fn create_identity(&self, key_name: &str) -> Result<String, AccountError> {
		Ok(format!("agoric1{}", key_name))
	}
}

/// Keyring that fails for worker `fail_at`.
pub(crate) struct FailingKeyring {
	pub(crate) fail_at: usize,
}

#[async_trait]
impl KeyringInterface for FailingKeyring {
	async fn create_identity(&self, key_name: &str) -> Result<String, AccountError> {
		if key_name == key_name_for(self.fail_at) {
			return Err(AccountError::ToolFailed {
				key_name: key_name.to_string(),
				message: "keyring locked".into(),
			});
		}
		Ok(format!("agoric1{}", key_name))
	}
}

struct FakeQuote {
	board: String,
	fault: Fault,
	recorder: Recorder,
}

#[async_trait]
impl QuoteInterface for FakeQuote {
	async fn board_id(&self, network: &NetworkDescriptor) -> Result<String, OfferError> {
		self.recorder
			.board_networks
			.lock()
			.unwrap()
			.push(network.clone());
		Ok(format!("{}\n", self.board))
	}

	async fn build_offer(
		&self,
		network: &NetworkDescriptor,
		request: &OfferRequest,
	) -> Result<OfferPayload, OfferError> {
		tokio::time::sleep(QUOTE_LATENCY).await;
		if self.fault == Fault::QuoteFails {
			return Err(OfferError::ToolFailed("node exited with status 1".into()));
		}
		Ok(OfferPayload(format!(
			"{} {} on {} board={} fee={}",
			request.direction, request.amount, network.chain_id, request.board_id, request.fee_pct
		)))
	}
}

struct FakeLedger {
	fault: Fault,
	recorder: Recorder,
}

#[async_trait]
impl LedgerInterface for FakeLedger {
	async fn sign_and_broadcast(
		&self,
		request: &BroadcastRequest<'_>,
	) -> Result<Option<TxHash>, LedgerError> {
		if self.fault == Fault::KeyNotFound {
			return Err(LedgerError::KeyNotFound {
				key_name: request.identity.key_name.clone(),
			});
		}
		let mut broadcasts = self.recorder.broadcasts.lock().unwrap();
		broadcasts.push((
			request.identity.key_name.clone(),
			request.offer.as_str().to_string(),
		));
		Ok(Some(TxHash(format!(
			"TX-{}-{}",
			request.identity.key_name,
			broadcasts.len()
		))))
	}
}

/// Pending on the first poll of a hash, included afterwards.
struct FakeTxStatus {
	fault: Fault,
	recorder: Recorder,
}

#[async_trait]
impl TxStatusInterface for FakeTxStatus {
	async fn get_status(&self, hash: &TxHash) -> Result<TxStatus, DeliveryError> {
		let mut polls = self.recorder.polls.lock().unwrap();
		let count = polls.entry(hash.0.clone()).or_default();
		*count += 1;
		if *count == 1 || self.fault == Fault::NeverIncluded {
			return Ok(TxStatus::Pending);
		}
		let (code, raw_log) = match self.fault {
			Fault::Rejected(code) => (code, "insufficient funds".to_string()),
			_ => (0, "[]".to_string()),
		};
		Ok(TxStatus::Included(TxResult {
			hash: hash.clone(),
			code,
			raw_log,
		}))
	}
}

struct FakeChainInfo {
	fault: Fault,
	recorder: Recorder,
}

#[async_trait]
impl ChainInfoInterface for FakeChainInfo {
	async fn fetch_chain_id(&self) -> Result<String, DeliveryError> {
		let previous = self.recorder.chain_id_lookups.fetch_add(1, Ordering::SeqCst);
		if let Fault::ChainInfoDown { failures } = self.fault {
			if previous < failures {
				return Err(DeliveryError::Network("status page unreachable".into()));
			}
		}
		Ok(CHAIN_ID.to_string())
	}
}

struct FakeFaucet {
	recorder: Recorder,
}

#[async_trait]
impl FaucetInterface for FakeFaucet {
	async fn provision(&self, _address: &str) -> Result<(), ProvisionError> {
		self.recorder.faucet_calls.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}
