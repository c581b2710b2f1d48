//! Worker pool that drives the per-identity transaction cycles.
//!
//! The [`LoadEngine`] owns everything the workers share: the frozen identity
//! pool, the chain context and the offer, broadcast and confirmation services.
//! [`LoadEngine::run`] starts one worker per identity and keeps them cycling
//! until the cancellation token fires.

pub mod context;
pub mod event_bus;
mod worker;

use self::context::ChainContext;
use self::event_bus::EventBus;
use self::worker::Worker;
use load_account::IdentityPool;
use load_delivery::{Broadcaster, ConfirmationPoller};
use load_offer::OfferService;
use load_types::BackoffPolicy;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// The engine was asked to run without any identity.
	#[error("No identities to run workers for")]
	NoIdentities,
	/// A worker task panicked or was aborted.
	#[error("Worker task failed: {0}")]
	Worker(String),
}

/// Per-cycle workload parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadSettings {
	/// Stable-asset amount of every offer.
	pub stable_amount: f64,
	/// Fee percentage paid on every offer.
	pub fee: f64,
	/// Delay policy applied after failed cycles.
	pub backoff: BackoffPolicy,
}

/// Totals reported when the engine stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
	/// Workers that ran.
	pub workers: usize,
	/// Cycles finished across all workers.
	pub cycles: u64,
}

/// Load engine running one worker per identity.
pub struct LoadEngine {
	identities: IdentityPool,
	context: Arc<ChainContext>,
	offers: Arc<OfferService>,
	broadcaster: Arc<Broadcaster>,
	poller: Arc<ConfirmationPoller>,
	event_bus: EventBus,
	settings: WorkloadSettings,
}

impl LoadEngine {
	/// Creates an engine from fully initialised services.
	///
	/// The context must already carry the resolved board id.
	pub fn new(
		identities: IdentityPool,
		context: Arc<ChainContext>,
		offers: Arc<OfferService>,
		broadcaster: Arc<Broadcaster>,
		poller: Arc<ConfirmationPoller>,
		event_bus: EventBus,
		settings: WorkloadSettings,
	) -> Self {
		Self {
			identities,
			context,
			offers,
			broadcaster,
			poller,
			event_bus,
			settings,
		}
	}

	/// Event bus carrying worker and cycle events.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// The frozen identity pool.
	pub fn identities(&self) -> &IdentityPool {
		&self.identities
	}

	/// Shared chain context.
	pub fn context(&self) -> &Arc<ChainContext> {
		&self.context
	}

	/// Runs one worker per identity until `cancel` fires.
	///
	/// Worker `i` signs exclusively with identity `i`. Returns once every
	/// worker has stopped.
	pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary, EngineError> {
		if self.identities.is_empty() {
			return Err(EngineError::NoIdentities);
		}

		tracing::info!(
			workers = self.identities.len(),
			board_id = %self.context.board_id(),
			"Starting workers"
		);

		let mut workers = JoinSet::new();
		for identity in self.identities.iter() {
			let worker = Worker {
				identity: identity.clone(),
				context: self.context.clone(),
				offers: self.offers.clone(),
				broadcaster: self.broadcaster.clone(),
				poller: self.poller.clone(),
				event_bus: self.event_bus.clone(),
				settings: self.settings,
			};
			workers.spawn(worker.run(cancel.clone()));
		}

		let mut summary = RunSummary {
			workers: self.identities.len(),
			cycles: 0,
		};
		let mut failure = None;
		while let Some(result) = workers.join_next().await {
			match result {
				Ok(cycles) => summary.cycles += cycles,
				Err(e) => {
					tracing::error!(error = %e, "Worker task failed");
					// One broken worker stops the pool.
					cancel.cancel();
					failure.get_or_insert(EngineError::Worker(e.to_string()));
				},
			}
		}

		if let Some(error) = failure {
			return Err(error);
		}

		tracing::info!(
			workers = summary.workers,
			cycles = summary.cycles,
			"All workers stopped"
		);
		Ok(summary)
	}
}
