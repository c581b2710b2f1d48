//! Run-wide cycle tallies built from the engine's event bus.

use load_core::EventBus;
use load_types::{CycleOutcome, LoadEvent};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;

/// Interval between progress lines.
const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Cycle outcomes counted across all workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
	pub completed: u64,
	pub failed: u64,
	/// Cycles that broadcast but never saw a result.
	pub unconfirmed: u64,
	pub active_workers: usize,
}

impl Totals {
	fn record(&mut self, event: &LoadEvent) {
		match event {
			LoadEvent::WorkerStarted { .. } => self.active_workers += 1,
			LoadEvent::WorkerStopped { .. } => {
				self.active_workers = self.active_workers.saturating_sub(1)
			},
			LoadEvent::CycleFinished(report) => match report.outcome {
				CycleOutcome::Completed { .. } => self.completed += 1,
				CycleOutcome::NothingToConfirm | CycleOutcome::TimedOut { .. } => {
					self.unconfirmed += 1
				},
				CycleOutcome::Rejected { .. } | CycleOutcome::Failed { .. } => self.failed += 1,
			},
		}
	}
}

/// Subscribes to `bus` and tallies events until every publisher is gone.
///
/// The subscription is taken before this returns, so no event published
/// afterwards is missed.
pub fn spawn(bus: &EventBus) -> JoinHandle<Totals> {
	let receiver = bus.subscribe();
	tokio::spawn(observe(receiver, REPORT_INTERVAL))
}

async fn observe(mut receiver: Receiver<LoadEvent>, every: Duration) -> Totals {
	let mut totals = Totals::default();
	let mut ticker = tokio::time::interval(every);
	// The first tick completes immediately.
	ticker.tick().await;

	loop {
		tokio::select! {
			event = receiver.recv() => match event {
				Ok(event) => totals.record(&event),
				Err(RecvError::Lagged(missed)) => {
					tracing::warn!(missed, "Observer fell behind; some cycles not counted");
				},
				Err(RecvError::Closed) => break,
			},
			_ = ticker.tick() => {
				tracing::info!(
					workers = totals.active_workers,
					completed = totals.completed,
					failed = totals.failed,
					unconfirmed = totals.unconfirmed,
					"Progress"
				);
			},
		}
	}

	totals
}
