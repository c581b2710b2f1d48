//! A single load worker and its cycle state machine.

use super::context::ChainContext;
use super::event_bus::EventBus;
use super::WorkloadSettings;
use chrono::Utc;
use load_delivery::{Broadcaster, ConfirmationPoller, DeliveryError};
use load_offer::OfferService;
use load_types::{
	sleep_or_cancel, truncate_id, Confirmation, CycleOutcome, CycleReport, CycleStage, Identity,
	LoadEvent, OfferDirection, OfferRequest,
};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Worker bound to one identity, running cycles until cancelled.
pub(crate) struct Worker {
	pub(crate) identity: Identity,
	pub(crate) context: Arc<ChainContext>,
	pub(crate) offers: Arc<OfferService>,
	pub(crate) broadcaster: Arc<Broadcaster>,
	pub(crate) poller: Arc<ConfirmationPoller>,
	pub(crate) event_bus: EventBus,
	pub(crate) settings: WorkloadSettings,
}

impl Worker {
	/// Runs cycles back to back until `cancel` fires; returns the number of
	/// cycles that finished.
	pub(crate) async fn run(self, cancel: CancellationToken) -> u64 {
		let worker = self.identity.index;
		tracing::debug!(worker, key = %self.identity.key_name, "Worker started");
		self.event_bus
			.publish(LoadEvent::WorkerStarted { worker })
			.ok();

		let mut backoff = self.settings.backoff.schedule();
		let mut direction = OfferDirection::Buy;
		let mut cycles = 0u64;

		while !cancel.is_cancelled() {
			let report = tokio::select! {
				_ = cancel.cancelled() => break,
				report = self.run_cycle(cycles, direction) => report,
			};
			log_report(&report);
			let failed = report.outcome.is_failure();
			self.event_bus.publish(LoadEvent::CycleFinished(report)).ok();

			cycles += 1;
			direction = direction.flip();

			if failed {
				let delay = backoff.next_delay();
				if !sleep_or_cancel(delay, &cancel).await {
					break;
				}
			} else {
				backoff.reset();
			}
		}

		tracing::debug!(worker, cycles, "Worker stopped");
		self.event_bus
			.publish(LoadEvent::WorkerStopped { worker, cycles })
			.ok();
		cycles
	}

	#[instrument(skip_all, fields(worker = self.identity.index, cycle = cycle, direction = %direction))]
	async fn run_cycle(&self, cycle: u64, direction: OfferDirection) -> CycleReport {
		let started_at = Utc::now();
		let start = Instant::now();
		let outcome = self.execute(direction).await;

		CycleReport {
			worker: self.identity.index,
			cycle,
			direction,
			started_at,
			duration: start.elapsed(),
			outcome,
		}
	}

	/// Chain id, offer, broadcast, confirmation. Any failure abandons the cycle.
	async fn execute(&self, direction: OfferDirection) -> CycleOutcome {
		let chain_id = match self.context.chain_id().await {
			Ok(chain_id) => chain_id,
			Err(e) => return failed(CycleStage::ChainContext, e),
		};

		let request = OfferRequest {
			direction,
			amount: self.settings.stable_amount,
			board_id: self.context.board_id().to_string(),
			fee_pct: self.settings.fee,
		};
		let offer = match self
			.offers
			.build(&self.context.network(chain_id), &request)
			.await
		{
			Ok(offer) => offer,
			Err(e) => return failed(CycleStage::Offer, e),
		};

		let tx_hash = match self
			.broadcaster
			.broadcast(&self.identity, chain_id, &offer)
			.await
		{
			Ok(Some(hash)) => hash,
			Ok(None) => return CycleOutcome::NothingToConfirm,
			Err(e) => return failed(CycleStage::Broadcast, e),
		};

		match self.poller.wait_for_confirmation(&tx_hash).await {
			Ok(Confirmation::Success(_)) => CycleOutcome::Completed { tx_hash },
			Ok(Confirmation::TimedOut { .. }) => CycleOutcome::TimedOut { tx_hash },
			Err(DeliveryError::TransactionRejected { code, raw_log, .. }) => CycleOutcome::Rejected {
				tx_hash,
				code,
				raw_log,
			},
			Err(e) => failed(CycleStage::Confirmation, e),
		}
	}
}

fn failed(stage: CycleStage, error: impl std::fmt::Display) -> CycleOutcome {
	CycleOutcome::Failed {
		stage,
		error: error.to_string(),
	}
}

fn log_report(report: &CycleReport) {
	let duration_ms = report.duration.as_millis() as u64;
	let tx_hash = report
		.outcome
		.tx_hash()
		.map(|hash| truncate_id(hash.as_str()))
		.unwrap_or_default();
	let outcome = report.outcome.label();

	match &report.outcome {
		CycleOutcome::Completed { .. } => tracing::info!(
			worker = report.worker,
			duration_ms,
			tx_hash = %tx_hash,
			outcome,
			"Completed cycle"
		),
		CycleOutcome::NothingToConfirm | CycleOutcome::TimedOut { .. } => tracing::warn!(
			worker = report.worker,
			duration_ms,
			tx_hash = %tx_hash,
			outcome,
			"Cycle ended without confirmation"
		),
		CycleOutcome::Rejected { code, raw_log, .. } => tracing::error!(
			worker = report.worker,
			duration_ms,
			tx_hash = %tx_hash,
			outcome,
			code,
			raw_log = %raw_log,
			"Error waiting for tx"
		),
		CycleOutcome::Failed { stage, error } => tracing::error!(
			worker = report.worker,
			duration_ms,
			outcome,
			stage = %stage,
			error = %error,
			"Error on cycle"
		),
	}
}
