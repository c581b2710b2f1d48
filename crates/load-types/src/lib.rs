//! Common types module for the psmload system.
//!
//! This module defines the core data types shared by the load generator
//! crates: worker identities, network endpoints, offers, transactions and
//! the per-cycle reports emitted by the worker pool.

/// Worker cycle outcomes and reports.
pub mod cycle;
/// Transaction hashes, results and confirmation outcomes.
pub mod delivery;
/// Event types published by the engine.
pub mod events;
/// Worker identity types.
pub mod identity;
/// Network descriptors and service endpoint derivation.
pub mod network;
/// Offer payloads and offer requests.
pub mod offer;
/// Utility functions shared by the tool adapters.
pub mod utils;

// Re-export all types for convenient access
pub use cycle::*;
pub use delivery::*;
pub use events::*;
pub use identity::*;
pub use network::*;
pub use offer::*;
pub use utils::{
	capture, run_tool, sleep_or_cancel, truncate_id, BackoffPolicy, BackoffSchedule, HttpClient,
	HttpError, HttpRetryPolicy, ToolCommand, ToolError, ToolOutput,
};
