//! Core load engine for the psmload system.
//!
//! This crate assembles the identity, offer, delivery and provisioning
//! services into a [`LoadEngine`]: a fixed pool of workers, each bound to one
//! identity, that build, broadcast and confirm offers in a loop until the run
//! is cancelled.

pub mod builder;
pub mod engine;

#[cfg(test)]
mod testing;

pub use builder::{BuilderError, LoadBuilder, LoadComponents};
pub use engine::context::ChainContext;
pub use engine::event_bus::EventBus;
pub use engine::{EngineError, LoadEngine, RunSummary, WorkloadSettings};
