//! Builder for constructing load engines.
//!
//! Composes a [`LoadEngine`] from the capability implementations and the
//! configuration. Everything that must succeed before the first worker
//! starts happens here, in order: identity creation, chain id lookup, board
//! resolution and the optional provisioning warm-up. Any failure aborts the
//! run.

use crate::engine::context::ChainContext;
use crate::engine::event_bus::EventBus;
use crate::engine::{LoadEngine, WorkloadSettings};
use load_account::{IdentityPool, KeyringInterface};
use load_config::Config;
use load_delivery::{
	BroadcastPolicy, Broadcaster, ChainInfoInterface, ConfirmationPoller, LedgerInterface,
	TxStatusInterface,
};
use load_offer::{OfferService, QuoteInterface};
use load_provision::{FaucetInterface, ProvisionService};
use load_types::NetworkDescriptor;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Capacity of the engine's event bus.
const EVENT_BUS_CAPACITY: usize = 1024;

/// Errors that can occur during load engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Identity creation failed: {0}")]
	Identity(String),
	#[error("Chain id lookup failed: {0}")]
	ChainId(String),
	#[error("Board resolution failed: {0}")]
	Board(String),
	#[error("Provisioning failed: {0}")]
	Provision(String),
}

/// Capability implementations the engine is assembled from.
pub struct LoadComponents {
	pub keyring: Box<dyn KeyringInterface>,
	pub quote: Box<dyn QuoteInterface>,
	pub ledger: Box<dyn LedgerInterface>,
	pub tx_status: Box<dyn TxStatusInterface>,
	pub chain_info: Box<dyn ChainInfoInterface>,
	pub faucet: Box<dyn FaucetInterface>,
}

/// Builder for constructing a LoadEngine.
pub struct LoadBuilder {
	config: Config,
}

impl LoadBuilder {
	/// Creates a new LoadBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine.
	///
	/// `cancel` interrupts the provisioning warm-up; identity creation, the
	/// chain id lookup and board resolution always run to completion.
	pub async fn build(
		self,
		components: LoadComponents,
		cancel: &CancellationToken,
	) -> Result<LoadEngine, BuilderError> {
		let config = self.config;
		let LoadComponents {
			keyring,
			quote,
			ledger,
			tx_status,
			chain_info,
			faucet,
		} = components;

		let endpoints = config
			.network
			.endpoints()
			.map_err(|e| BuilderError::Config(e.to_string()))?;
		tracing::info!(
			component = "network",
			root = %endpoints.root,
			rpc = %endpoints.rpc,
			api = %endpoints.api,
			faucet = %endpoints.faucet,
			"Loaded"
		);

		// Identities are created one at a time and frozen before anything else.
		let identities = IdentityPool::create(keyring.as_ref(), config.load.workers)
			.await
			.map_err(|e| BuilderError::Identity(e.to_string()))?;
		tracing::info!(component = "account", identities = identities.len(), "Loaded");

		let chain_id = match chain_info.fetch_chain_id().await {
			Ok(chain_id) => chain_id,
			Err(e) => {
				tracing::error!(component = "chain", error = %e, "Failed to resolve chain id");
				return Err(BuilderError::ChainId(e.to_string()));
			},
		};
		tracing::info!(component = "chain", chain_id = %chain_id, "Loaded");

		let offers = OfferService::new(quote);
		let board_network = NetworkDescriptor {
			rpc: endpoints.rpc.clone(),
			chain_id: chain_id.clone(),
		};
		let board_id = match offers.resolve_board_id(&board_network).await {
			Ok(board_id) => board_id,
			Err(e) => {
				tracing::error!(component = "offer", error = %e, "Failed to resolve board id");
				return Err(BuilderError::Board(e.to_string()));
			},
		};
		tracing::info!(component = "offer", board_id = %board_id, "Loaded");

		let provision = Arc::new(ProvisionService::new(faucet, config.backoff.policy()));
		if config.provision.enabled {
			provision
				.provision_all(&identities.shared(), config.load.workers, cancel)
				.await
				.map_err(|e| BuilderError::Provision(e.to_string()))?;
		}

		let broadcaster = Broadcaster::new(
			ledger,
			provision,
			endpoints.rpc.clone(),
			BroadcastPolicy {
				key_not_found_cooldown: config.delivery.key_not_found_cooldown(),
				retry_after_provision: config.delivery.retry_after_provision,
			},
		);
		let poller = ConfirmationPoller::new(
			tx_status,
			config.delivery.confirmation_attempts,
			config.delivery.confirmation_interval(),
		);
		// Workers share the lookup made above.
		let context = ChainContext::with_chain_id(endpoints, board_id, chain_id, chain_info);

		Ok(LoadEngine::new(
			identities,
			Arc::new(context),
			Arc::new(offers),
			Arc::new(broadcaster),
			Arc::new(poller),
			EventBus::new(EVENT_BUS_CAPACITY),
			WorkloadSettings {
				stable_amount: config.load.stable_amount,
				fee: config.load.fee,
				backoff: config.backoff.policy(),
			},
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{FailingKeyring, Fault, FakeNetwork, CHAIN_ID};
	use load_config::builders::config::ConfigBuilder;
	use load_types::{CycleOutcome, LoadEvent};
	use std::collections::HashMap;
	use std::time::Duration;

	fn config(workers: usize) -> Config {
		ConfigBuilder::new()
			.workers(workers)
			.fee(0.011)
			.confirmation(50, 500)
			.backoff(0, 0)
			.build()
	}

	#[tokio::test(start_paused = true)]
	async fn test_three_workers_report_completed_cycles() {
		let network = FakeNetwork::new("board0511");
		let cancel = CancellationToken::new();
		let engine = LoadBuilder::new(config(3))
			.build(network.components(), &cancel)
			.await
			.unwrap();

		assert_eq!(engine.identities().len(), 3);
		assert_eq!(engine.context().board_id(), "board0511");

		let mut events = engine.event_bus().subscribe();
		let stopper = cancel.clone();
		let run = tokio::spawn(async move { engine.run(stopper).await });

		let mut completed: HashMap<usize, u64> = HashMap::new();
		while completed.values().sum::<u64>() < 9 {
			if let LoadEvent::CycleFinished(report) = events.recv().await.unwrap() {
				assert!(report.outcome.is_completed(), "{:?}", report.outcome);
				assert!(report.worker < 3);
				assert!(report.duration >= Duration::ZERO);
				*completed.entry(report.worker).or_default() += 1;
			}
		}
		cancel.cancel();

		let summary = run.await.unwrap().unwrap();
		assert_eq!(summary.workers, 3);
		assert!(summary.cycles >= 9);
		assert_eq!(completed.len(), 3);

		// Each completed cycle broadcast exactly one offer with the configured fee.
		for offer in network.offers() {
			assert!(offer.contains("board0511"));
			assert!(offer.contains("fee=0.011"));
		}
		assert_eq!(network.chain_id_lookups(), 1);
	}

	#[tokio::test]
	async fn test_invalid_board_aborts_before_workers() {
		let network = FakeNetwork::new("not-a-board-id");
		let result = LoadBuilder::new(config(3))
			.build(network.components(), &CancellationToken::new())
			.await;

		assert!(matches!(result, Err(BuilderError::Board(ref m)) if m.contains("not-a-board-id")));
		assert!(network.offers().is_empty());
		assert_eq!(network.faucet_calls(), 0);
	}

	#[tokio::test]
	async fn test_board_resolution_carries_chain_id() {
		let network = FakeNetwork::new("board0511");
		let engine = LoadBuilder::new(config(2))
			.build(network.components(), &CancellationToken::new())
			.await
			.unwrap();

		let networks = network.board_networks();
		assert_eq!(networks.len(), 1);
		assert_eq!(networks[0].chain_id, CHAIN_ID);
		assert_eq!(networks[0].rpc, engine.context().endpoints().rpc);
		assert!(networks[0]
			.to_json()
			.contains(&format!(r#""chainId":"{}""#, CHAIN_ID)));

		// Workers reuse the id looked up during the build.
		assert_eq!(engine.context().chain_id().await.unwrap(), CHAIN_ID);
		assert_eq!(network.chain_id_lookups(), 1);
	}

	#[tokio::test]
	async fn test_chain_id_failure_is_fatal() {
		let network = FakeNetwork::with_fault("board0511", Fault::ChainInfoDown { failures: 1 });
		let config = ConfigBuilder::from_config(config(2)).provision(true).build();

		let result = LoadBuilder::new(config)
			.build(network.components(), &CancellationToken::new())
			.await;
		assert!(matches!(result, Err(BuilderError::ChainId(ref m)) if m.contains("unreachable")));
		assert!(network.board_networks().is_empty());
		assert_eq!(network.faucet_calls(), 0);
	}

	#[tokio::test]
	async fn test_identity_failure_is_fatal() {
		let network = FakeNetwork::new("board0511");
		let mut components = network.components();
		components.keyring = Box::new(FailingKeyring { fail_at: 1 });

		let result = LoadBuilder::new(config(3))
			.build(components, &CancellationToken::new())
			.await;
		assert!(matches!(result, Err(BuilderError::Identity(_))));
	}

	#[tokio::test]
	async fn test_provisioning_warm_up() {
		let network = FakeNetwork::new("board0511");
		let config = ConfigBuilder::from_config(config(4)).provision(true).build();

		LoadBuilder::new(config)
			.build(network.components(), &CancellationToken::new())
			.await
			.unwrap();
		assert_eq!(network.faucet_calls(), 4);
	}

	#[tokio::test(start_paused = true)]
	async fn test_completed_outcome_carries_hash() {
		let network = FakeNetwork::new("board0511");
		let cancel = CancellationToken::new();
		let engine = LoadBuilder::new(config(1))
			.build(network.components(), &cancel)
			.await
			.unwrap();

		let mut events = engine.event_bus().subscribe();
		let stopper = cancel.clone();
		let run = tokio::spawn(async move { engine.run(stopper).await });

		loop {
			if let LoadEvent::CycleFinished(report) = events.recv().await.unwrap() {
				match report.outcome {
					CycleOutcome::Completed { tx_hash } => {
						assert!(tx_hash.as_str().starts_with("TX-key0-"));
						break;
					},
					other => panic!("unexpected outcome {:?}", other),
				}
			}
		}
		cancel.cancel();
		run.await.unwrap().unwrap();
	}
}
