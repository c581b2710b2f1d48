//! Event types published by the load engine.
//!
//! Events flow through the engine's event bus so that observers (the binary's
//! summary logger, tests) can follow the run without touching worker state.

use crate::CycleReport;
use serde::{Deserialize, Serialize};

/// Main event type encompassing all load generator events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LoadEvent {
	/// A worker started its cycle loop.
	WorkerStarted { worker: usize },
	/// A worker finished one cycle.
	CycleFinished(CycleReport),
	/// A worker left its cycle loop after cancellation.
	WorkerStopped { worker: usize, cycles: u64 },
}
