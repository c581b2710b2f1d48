//! Provisioning module for the psmload system.
//!
//! Worker identities need a funded smart wallet before their offers can
//! execute. This module defines the faucet abstraction and the
//! [`ProvisionService`], which provisions a single identity on demand or the
//! whole identity pool as a warm-up step before the workers start.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use load_types::{sleep_or_cancel, BackoffPolicy, Identity};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors that can occur during provisioning.
#[derive(Debug, Error)]
pub enum ProvisionError {
	/// The faucet could not be reached.
	#[error("Faucet request failed: {0}")]
	Network(String),
	/// The faucet answered with a non-success status.
	#[error("Faucet rejected {address} with status {status}")]
	Rejected { address: String, status: u16 },
	/// Provisioning stopped because the run was cancelled.
	#[error("Provisioning cancelled")]
	Cancelled,
}

/// Trait defining the interface for faucet implementations.
#[async_trait]
pub trait FaucetInterface: Send + Sync {
	/// Funds and activates the smart wallet of `address`.
	async fn provision(&self, address: &str) -> Result<(), ProvisionError>;
}

/// Service that provisions identities through a faucet implementation.
pub struct ProvisionService {
	implementation: Box<dyn FaucetInterface>,
	backoff: BackoffPolicy,
}

impl ProvisionService {
	/// Creates a new ProvisionService.
	///
	/// `backoff` paces the retries of [`ProvisionService::provision_all`].
	pub fn new(implementation: Box<dyn FaucetInterface>, backoff: BackoffPolicy) -> Self {
		Self {
			implementation,
			backoff,
		}
	}

	/// Performs a single provisioning attempt for `identity`.
	pub async fn provision(&self, identity: &Identity) -> Result<(), ProvisionError> {
		self.implementation.provision(&identity.address).await
	}

	/// Provisions every identity, at most `concurrency` at a time.
	///
	/// Each identity is retried until the faucet accepts it, so the only way
	/// this returns an error is cancellation.
	pub async fn provision_all(
		&self,
		identities: &[Identity],
		concurrency: usize,
		cancel: &CancellationToken,
	) -> Result<(), ProvisionError> {
		let total = identities.len();
		tracing::info!(total, concurrency, "Provisioning identities");

		let mut pending = stream::iter(identities)
			.map(|identity| self.provision_until_success(identity, cancel))
			.buffer_unordered(concurrency.max(1));

		let mut done = 0usize;
		while let Some(result) = pending.next().await {
			let identity = result?;
			done += 1;
			tracing::info!(
				key = %identity.key_name,
				address = %identity.address,
				done,
				total,
				"Identity provisioned"
			);
		}

		Ok(())
	}

	async fn provision_until_success<'a>(
		&self,
		identity: &'a Identity,
		cancel: &CancellationToken,
	) -> Result<&'a Identity, ProvisionError> {
		let mut schedule = self.backoff.schedule();
		let mut attempt = 0u32;

		loop {
			attempt += 1;
			let result = tokio::select! {
				_ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
				result = self.provision(identity) => result,
			};

			match result {
				Ok(()) => return Ok(identity),
				Err(e) => {
					let delay = schedule.next_delay();
					tracing::warn!(
						key = %identity.key_name,
						attempt,
						error = %e,
						retry_in_ms = delay.as_millis() as u64,
						"Provisioning failed, retrying"
					);
					if !sleep_or_cancel(delay, cancel).await {
						return Err(ProvisionError::Cancelled);
					}
				},
			}
		}
	}
}
