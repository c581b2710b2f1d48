//! Backoff and cancellation helpers.
//!
//! Failed worker cycles and provisioning retries wait according to a
//! [`BackoffPolicy`]. Every wait races a [`CancellationToken`] so that a
//! shutdown request interrupts sleeping workers immediately.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Exponential backoff with jitter, bounded by `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
	/// First delay; zero disables backoff.
	pub initial: Duration,
	/// Upper bound for any delay.
	pub max: Duration,
	/// Growth factor between consecutive delays.
	pub multiplier: f64,
	/// Jitter as a fraction of the delay.
	pub randomization_factor: f64,
}

impl BackoffPolicy {
	/// Policy that never waits.
	pub fn none() -> Self {
		Self {
			initial: Duration::ZERO,
			max: Duration::ZERO,
			multiplier: 1.0,
			randomization_factor: 0.0,
		}
	}

	/// Fixed delay without jitter.
	pub fn fixed(delay: Duration) -> Self {
		Self {
			initial: delay,
			max: delay,
			multiplier: 1.0,
			randomization_factor: 0.0,
		}
	}

	/// Starts a fresh delay sequence.
	pub fn schedule(&self) -> BackoffSchedule {
		if self.initial.is_zero() {
			return BackoffSchedule { inner: None };
		}
		let inner = ExponentialBackoffBuilder::new()
			.with_initial_interval(self.initial)
			.with_max_interval(self.max.max(self.initial))
			.with_multiplier(self.multiplier)
			.with_randomization_factor(self.randomization_factor)
			.with_max_elapsed_time(None)
			.build();
		BackoffSchedule { inner: Some(inner) }
	}
}

/// Stateful delay sequence produced by a [`BackoffPolicy`].
pub struct BackoffSchedule {
	inner: Option<ExponentialBackoff>,
}

impl BackoffSchedule {
	/// Returns the next delay; grows until the policy's maximum.
	pub fn next_delay(&mut self) -> Duration {
		self.inner
			.as_mut()
			.and_then(|b| b.next_backoff())
			.unwrap_or(Duration::ZERO)
	}

	/// Restarts the sequence from the initial delay.
	pub fn reset(&mut self) {
		if let Some(inner) = self.inner.as_mut() {
			inner.reset();
		}
	}
}

/// Sleeps for `delay` unless `cancel` fires first.
///
/// Returns `false` when cancelled. A zero delay still yields to the runtime.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
	if cancel.is_cancelled() {
		return false;
	}
	if delay.is_zero() {
		tokio::task::yield_now().await;
		return !cancel.is_cancelled();
	}
	tokio::select! {
		_ = cancel.cancelled() => false,
		_ = tokio::time::sleep(delay) => true,
	}
}
