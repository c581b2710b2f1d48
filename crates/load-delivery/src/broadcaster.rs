//! Offer broadcasting with compensating provisioning.
//!
//! A broadcast that fails because the signing key is unknown means the
//! identity's wallet was never provisioned. The broadcaster provisions it
//! once, waits for the faucet transaction to land and then either fails the
//! cycle or retries the broadcast a single time, depending on
//! [`BroadcastPolicy::retry_after_provision`].

use crate::{BroadcastRequest, DeliveryError, LedgerError, LedgerInterface};
use load_provision::ProvisionService;
use load_types::{truncate_id, Identity, OfferPayload, TxHash};
use std::sync::Arc;
use std::time::Duration;

/// How the broadcaster reacts to a missing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastPolicy {
	/// Pause after provisioning an identity whose key was not found.
	pub key_not_found_cooldown: Duration,
	/// Retry the broadcast once after the cooldown.
	pub retry_after_provision: bool,
}

impl Default for BroadcastPolicy {
	fn default() -> Self {
		Self {
			key_not_found_cooldown: Duration::from_secs(10),
			retry_after_provision: false,
		}
	}
}

/// Signs and submits offers through a ledger implementation.
pub struct Broadcaster {
	ledger: Box<dyn LedgerInterface>,
	provision: Arc<ProvisionService>,
	rpc: String,
	policy: BroadcastPolicy,
}

impl Broadcaster {
	/// Creates a broadcaster submitting to `rpc`.
	pub fn new(
		ledger: Box<dyn LedgerInterface>,
		provision: Arc<ProvisionService>,
		rpc: impl Into<String>,
		policy: BroadcastPolicy,
	) -> Self {
		Self {
			ledger,
			provision,
			rpc: rpc.into(),
			policy,
		}
	}

	/// Signs and submits `offer` with the key of `identity`.
	///
	/// `Ok(None)` means the tool succeeded without printing a hash, so there
	/// is nothing to confirm.
	pub async fn broadcast(
		&self,
		identity: &Identity,
		chain_id: &str,
		offer: &OfferPayload,
	) -> Result<Option<TxHash>, DeliveryError> {
		let request = BroadcastRequest {
			identity,
			chain_id,
			rpc: &self.rpc,
			offer,
		};

		match self.ledger.sign_and_broadcast(&request).await {
			Ok(hash) => {
				log_submitted(identity, hash.as_ref());
				Ok(hash)
			},
			Err(LedgerError::KeyNotFound { key_name }) => {
				self.provision_missing_key(identity).await;
				if !self.policy.retry_after_provision {
					return Err(DeliveryError::BroadcastFailed(format!(
						"key {} not found; identity provisioned",
						key_name
					)));
				}

				match self.ledger.sign_and_broadcast(&request).await {
					Ok(hash) => {
						log_submitted(identity, hash.as_ref());
						Ok(hash)
					},
					Err(e) => Err(self.broadcast_failed(identity, e)),
				}
			},
			Err(e) => Err(self.broadcast_failed(identity, e)),
		}
	}

	async fn provision_missing_key(&self, identity: &Identity) {
		tracing::info!(
			key = %identity.key_name,
			address = %identity.address,
			"Client is not provisioned, provisioning"
		);
		if let Err(e) = self.provision.provision(identity).await {
			tracing::warn!(
				key = %identity.key_name,
				error = %e,
				"Compensating provisioning failed"
			);
		}
		tokio::time::sleep(self.policy.key_not_found_cooldown).await;
	}

	fn broadcast_failed(&self, identity: &Identity, error: LedgerError) -> DeliveryError {
		match &error {
			LedgerError::Failed {
				code,
				stdout,
				stderr,
			} => tracing::error!(
				key = %identity.key_name,
				code = ?code,
				stdout = %stdout,
				stderr = %stderr,
				"Error broadcasting offer"
			),
			other => tracing::error!(
				key = %identity.key_name,
				error = %other,
				"Error broadcasting offer"
			),
		}
		DeliveryError::BroadcastFailed(error.to_string())
	}
}

fn log_submitted(identity: &Identity, hash: Option<&TxHash>) {
	match hash {
		Some(hash) => tracing::debug!(
			key = %identity.key_name,
			tx_hash = %truncate_id(hash.as_str()),
			"Offer submitted"
		),
		None => tracing::debug!(key = %identity.key_name, "Offer submitted without hash"),
	}
}
