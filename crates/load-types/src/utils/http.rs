//! HTTP client with bounded retries.
//!
//! All HTTP collaborators (chain status page, transaction status API, faucet)
//! share this client. Transport-level failures (connect errors, timeouts) are
//! retried up to `max_retries` times with exponential waits starting at
//! `min_wait`; every response, whatever its status, is returned to the caller.

use backoff::ExponentialBackoffBuilder;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while issuing HTTP requests.
#[derive(Debug, Error)]
pub enum HttpError {
	/// The underlying client could not be constructed.
	#[error("Failed to build HTTP client: {0}")]
	Client(String),
	/// The request failed at the transport level on every attempt.
	#[error("Request to {url} failed after {attempts} attempts: {message}")]
	Request {
		url: String,
		attempts: u32,
		message: String,
	},
}

/// Retry and timeout settings for [`HttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpRetryPolicy {
	/// Retries after the first failed attempt.
	pub max_retries: u32,
	/// Wait before the first retry; later waits double.
	pub min_wait: Duration,
	/// Timeout for each individual attempt.
	pub timeout: Duration,
}

/// Shared HTTP client; cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
	client: reqwest::Client,
	policy: HttpRetryPolicy,
}

impl HttpClient {
	/// Builds a client enforcing `policy`.
	pub fn new(policy: HttpRetryPolicy) -> Result<Self, HttpError> {
		let client = reqwest::Client::builder()
			.timeout(policy.timeout)
			.build()
			.map_err(|e| HttpError::Client(e.to_string()))?;
		Ok(Self { client, policy })
	}

	/// Issues a GET request.
	pub async fn get(&self, url: &str) -> Result<reqwest::Response, HttpError> {
		self.execute(url, |client| client.get(url)).await
	}

	/// Issues a POST request with a URL-encoded form body.
	pub async fn post_form<T>(&self, url: &str, form: &T) -> Result<reqwest::Response, HttpError>
	where
		T: Serialize + ?Sized,
	{
		self.execute(url, |client| client.post(url).form(form))
			.await
	}

	async fn execute<F>(&self, url: &str, build: F) -> Result<reqwest::Response, HttpError>
	where
		F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
	{
		let schedule = ExponentialBackoffBuilder::new()
			.with_initial_interval(self.policy.min_wait)
			.with_max_interval(self.policy.min_wait.saturating_mul(8))
			.with_multiplier(2.0)
			.with_randomization_factor(0.0)
			.with_max_elapsed_time(None)
			.build();

		let attempts = AtomicU32::new(0);
		let max_retries = self.policy.max_retries;
		let (client, build, attempts_ref) = (&self.client, &build, &attempts);

		let result = backoff::future::retry_notify(
			schedule,
			move || async move {
				let attempt = attempts_ref.fetch_add(1, Ordering::SeqCst) + 1;
				match build(client).send().await {
					Ok(response) => Ok(response),
					Err(e) if attempt > max_retries => Err(backoff::Error::permanent(e)),
					Err(e) => Err(backoff::Error::transient(e)),
				}
			},
			|e: reqwest::Error, wait: Duration| {
				tracing::debug!(url = %url, error = %e, wait_ms = wait.as_millis() as u64, "Retrying HTTP request");
			},
		)
		.await;

		result.map_err(|e| HttpError::Request {
			url: url.to_string(),
			attempts: attempts.load(Ordering::SeqCst),
			message: e.to_string(),
		})
	}
}
