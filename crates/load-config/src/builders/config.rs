//! Configuration builder for creating test and development configurations.
//!
//! This module provides utilities for constructing Config instances with
//! sensible defaults, particularly useful for testing scenarios and for the
//! command-line overrides applied by the service binary.

use crate::{
	BackoffConfig, Config, DeliveryConfig, HttpConfig, LoadConfig, NetworkConfig,
	ProvisionConfig, ToolsConfig,
};
use std::path::PathBuf;

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	load: LoadConfig,
	root: String,
	http: HttpConfig,
	tools: ToolsConfig,
	delivery: DeliveryConfig,
	provision: ProvisionConfig,
	backoff: BackoffConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` targeting a local test network.
	pub fn new() -> Self {
		Self {
			load: LoadConfig::default(),
			root: "http://testnet.localhost:8080".to_string(),
			http: HttpConfig::default(),
			tools: ToolsConfig::default(),
			delivery: DeliveryConfig::default(),
			provision: ProvisionConfig::default(),
			backoff: BackoffConfig::default(),
		}
	}

	/// Starts from an existing configuration.
	pub fn from_config(config: Config) -> Self {
		Self {
			load: config.load,
			root: config.network.root,
			http: config.http,
			tools: config.tools,
			delivery: config.delivery,
			provision: config.provision,
			backoff: config.backoff,
		}
	}

	/// Sets the network root.
	pub fn root(mut self, root: impl Into<String>) -> Self {
		self.root = root.into();
		self
	}

	/// Sets the number of workers.
	pub fn workers(mut self, workers: usize) -> Self {
		self.load.workers = workers;
		self
	}

	/// Sets the fee percentage.
	pub fn fee(mut self, fee: f64) -> Self {
		self.load.fee = fee;
		self
	}

	/// Sets the stable-asset amount per offer.
	pub fn stable_amount(mut self, amount: f64) -> Self {
		self.load.stable_amount = amount;
		self
	}

	/// Sets the keystore state directory.
	pub fn state_dir(mut self, dir: Option<PathBuf>) -> Self {
		self.load.state_dir = dir;
		self
	}

	/// Enables or disables warm-up provisioning.
	pub fn provision(mut self, enabled: bool) -> Self {
		self.provision.enabled = enabled;
		self
	}

	/// Sets the confirmation polling budget.
	pub fn confirmation(mut self, attempts: u32, interval_ms: u64) -> Self {
		self.delivery.confirmation_attempts = attempts;
		self.delivery.confirmation_interval_ms = interval_ms;
		self
	}

	/// Sets the key-not-found cooldown in seconds.
	pub fn key_not_found_cooldown_seconds(mut self, seconds: u64) -> Self {
		self.delivery.key_not_found_cooldown_seconds = seconds;
		self
	}

	/// Retries the broadcast once after compensating provisioning.
	pub fn retry_after_provision(mut self, retry: bool) -> Self {
		self.delivery.retry_after_provision = retry;
		self
	}

	/// Sets the cycle backoff bounds in milliseconds.
	pub fn backoff(mut self, initial_ms: u64, max_ms: u64) -> Self {
		self.backoff.initial_ms = initial_ms;
		self.backoff.max_ms = max_ms;
		self
	}

	/// Sets the HTTP retry policy.
	pub fn http_retries(mut self, max_retries: u32, min_retry_wait_ms: u64) -> Self {
		self.http.max_retries = max_retries;
		self.http.min_retry_wait_ms = min_retry_wait_ms;
		self
	}

	/// Builds the `Config` with the configured values.
	///
	/// The result is not validated; call [`Config::validate`] when the values
	/// come from user input.
	pub fn build(self) -> Config {
		Config {
			load: self.load,
			network: NetworkConfig { root: self.root },
			http: self.http,
			tools: self.tools,
			delivery: self.delivery,
			provision: self.provision,
			backoff: self.backoff,
		}
	}
}
