//! Bounded confirmation polling.

use crate::{DeliveryError, TxStatusInterface};
use load_types::{Confirmation, TxHash, TxStatus};
use std::time::Duration;

/// Polls the status endpoint until a transaction is included.
///
/// At most `attempts` requests are issued, `interval` apart. A result code of
/// zero is success; any other code is a rejection and ends polling at once.
/// Lookup errors and pending answers are retried until the budget runs out,
/// which yields [`Confirmation::TimedOut`].
pub struct ConfirmationPoller {
	status: Box<dyn TxStatusInterface>,
	attempts: u32,
	interval: Duration,
}

impl ConfirmationPoller {
	/// Creates a poller with the given attempt budget and spacing.
	pub fn new(status: Box<dyn TxStatusInterface>, attempts: u32, interval: Duration) -> Self {
		Self {
			status,
			attempts: attempts.max(1),
			interval,
		}
	}

	/// Waits for `hash` to be included and reports its result.
	pub async fn wait_for_confirmation(
		&self,
		hash: &TxHash,
	) -> Result<Confirmation, DeliveryError> {
		for attempt in 1..=self.attempts {
			match self.status.get_status(hash).await {
				Ok(TxStatus::Included(result)) if result.is_success() => {
					return Ok(Confirmation::Success(result));
				},
				Ok(TxStatus::Included(result)) => {
					tracing::warn!(
						tx_hash = %hash,
						code = result.code,
						raw_log = %result.raw_log,
						"Transaction was rejected"
					);
					return Err(DeliveryError::TransactionRejected {
						hash: result.hash,
						code: result.code,
						raw_log: result.raw_log,
					});
				},
				Ok(TxStatus::Pending) => {
					tracing::trace!(tx_hash = %hash, attempt, "Transaction not found yet");
				},
				Err(e) => {
					tracing::debug!(tx_hash = %hash, attempt, error = %e, "Error getting transaction");
				},
			}

			if attempt < self.attempts {
				tokio::time::sleep(self.interval).await;
			}
		}

		tracing::warn!(tx_hash = %hash, attempts = self.attempts, "Transaction not confirmed in time");
		Ok(Confirmation::TimedOut {
			attempts: self.attempts,
		})
	}
}
