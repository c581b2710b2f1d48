//! Configuration module for the psmload system.
//!
//! This module provides structures and utilities for managing load generator
//! configuration. It supports loading configuration from TOML files with
//! `${VAR}` environment substitution and validates all values on parse.
//! Every section except `[network]` has defaults, so a configuration can also
//! be built from a network root alone with [`Config::for_root`].

pub mod builders;

use load_types::{BackoffPolicy, HttpRetryPolicy, NetworkError, ServiceEndpoints};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

impl From<NetworkError> for ConfigError {
	fn from(err: NetworkError) -> Self {
		ConfigError::Validation(err.to_string())
	}
}

/// Main configuration structure for psmload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Workload shape: worker count, offer sizes, state directory.
	#[serde(default)]
	pub load: LoadConfig,
	/// Target network.
	pub network: NetworkConfig,
	/// HTTP client behaviour shared by all HTTP adapters.
	#[serde(default)]
	pub http: HttpConfig,
	/// External tool locations.
	#[serde(default)]
	pub tools: ToolsConfig,
	/// Broadcast and confirmation policy.
	#[serde(default)]
	pub delivery: DeliveryConfig,
	/// Faucet provisioning.
	#[serde(default)]
	pub provision: ProvisionConfig,
	/// Backoff applied between failed cycles and provisioning retries.
	#[serde(default)]
	pub backoff: BackoffConfig,
}

/// Workload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoadConfig {
	/// Number of workers (and identities).
	#[serde(default = "default_workers")]
	pub workers: usize,
	/// Fee percentage paid on each offer.
	#[serde(default = "default_fee")]
	pub fee: f64,
	/// Stable-asset amount per offer.
	#[serde(default = "default_stable_amount")]
	pub stable_amount: f64,
	/// Keystore home for the key and ledger tools; a scratch directory when unset.
	#[serde(default)]
	pub state_dir: Option<PathBuf>,
}

fn default_workers() -> usize {
	10
}

fn default_fee() -> f64 {
	0.011
}

fn default_stable_amount() -> f64 {
	0.01
}

impl Default for LoadConfig {
	fn default() -> Self {
		Self {
			workers: default_workers(),
			fee: default_fee(),
			stable_amount: default_stable_amount(),
			state_dir: None,
		}
	}
}

/// Target network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Network root URL, e.g. `https://ollinet.agoric.net:443`.
	pub root: String,
}

impl NetworkConfig {
	/// Derives the service endpoints from the root.
	pub fn endpoints(&self) -> Result<ServiceEndpoints, ConfigError> {
		Ok(ServiceEndpoints::from_root(&self.root)?)
	}
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
	/// Retries after the first failed request.
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	/// Minimum wait between retries in milliseconds.
	#[serde(default = "default_min_retry_wait_ms")]
	pub min_retry_wait_ms: u64,
	/// Per-request timeout in seconds.
	#[serde(default = "default_http_timeout")]
	pub timeout_seconds: u64,
}

fn default_max_retries() -> u32 {
	10
}

fn default_min_retry_wait_ms() -> u64 {
	3000
}

fn default_http_timeout() -> u64 {
	120
}

impl HttpConfig {
	/// Minimum wait between retries.
	pub fn min_retry_wait(&self) -> Duration {
		Duration::from_millis(self.min_retry_wait_ms)
	}

	/// Per-request timeout.
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}

	/// Retry policy for the shared HTTP client.
	pub fn retry_policy(&self) -> HttpRetryPolicy {
		HttpRetryPolicy {
			max_retries: self.max_retries,
			min_wait: self.min_retry_wait(),
			timeout: self.timeout(),
		}
	}
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			max_retries: default_max_retries(),
			min_retry_wait_ms: default_min_retry_wait_ms(),
			timeout_seconds: default_http_timeout(),
		}
	}
}

/// External tool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
	/// Chain daemon CLI used for key management and signing.
	#[serde(default = "default_agd")]
	pub agd: String,
	/// Keyring backend passed to every keystore operation.
	#[serde(default = "default_keyring_backend")]
	pub keyring_backend: String,
	/// Program that runs the offer-quoting script.
	#[serde(default = "default_quote")]
	pub quote: String,
	/// Script passed as the first argument to `quote`; omitted when empty.
	#[serde(default = "default_quote_script")]
	pub quote_script: String,
	/// Extra environment for the quoting tool.
	#[serde(default = "default_quote_env")]
	pub quote_env: HashMap<String, String>,
}

fn default_agd() -> String {
	"agd".to_string()
}

fn default_keyring_backend() -> String {
	"test".to_string()
}

fn default_quote() -> String {
	"node".to_string()
}

fn default_quote_script() -> String {
	"psm-tool.js".to_string()
}

/// The quoting tool is a node script that needs fetch and quiet warnings.
fn default_quote_env() -> HashMap<String, String> {
	HashMap::from([
		(
			"NODE_OPTIONS".to_string(),
			"--experimental-fetch".to_string(),
		),
		("NODE_NO_WARNINGS".to_string(), "1".to_string()),
	])
}

impl Default for ToolsConfig {
	fn default() -> Self {
		Self {
			agd: default_agd(),
			keyring_backend: default_keyring_backend(),
			quote: default_quote(),
			quote_script: default_quote_script(),
			quote_env: default_quote_env(),
		}
	}
}

/// Broadcast and confirmation policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Status requests issued before confirmation polling gives up.
	#[serde(default = "default_confirmation_attempts")]
	pub confirmation_attempts: u32,
	/// Delay between status requests in milliseconds.
	#[serde(default = "default_confirmation_interval_ms")]
	pub confirmation_interval_ms: u64,
	/// Pause after provisioning an identity whose key was not found.
	#[serde(default = "default_key_not_found_cooldown")]
	pub key_not_found_cooldown_seconds: u64,
	/// Retry the broadcast once after the cooldown instead of failing the cycle.
	#[serde(default)]
	pub retry_after_provision: bool,
}

fn default_confirmation_attempts() -> u32 {
	50
}

fn default_confirmation_interval_ms() -> u64 {
	500
}

fn default_key_not_found_cooldown() -> u64 {
	10
}

impl DeliveryConfig {
	/// Delay between status requests.
	pub fn confirmation_interval(&self) -> Duration {
		Duration::from_millis(self.confirmation_interval_ms)
	}

	/// Cooldown after compensating provisioning.
	pub fn key_not_found_cooldown(&self) -> Duration {
		Duration::from_secs(self.key_not_found_cooldown_seconds)
	}
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			confirmation_attempts: default_confirmation_attempts(),
			confirmation_interval_ms: default_confirmation_interval_ms(),
			key_not_found_cooldown_seconds: default_key_not_found_cooldown(),
			retry_after_provision: false,
		}
	}
}

/// Faucet provisioning configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvisionConfig {
	/// Provision every identity before the workers start.
	#[serde(default)]
	pub enabled: bool,
	/// Path of the faucet form endpoint.
	#[serde(default = "default_faucet_path")]
	pub faucet_path: String,
}

fn default_faucet_path() -> String {
	"/go".to_string()
}

impl Default for ProvisionConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			faucet_path: default_faucet_path(),
		}
	}
}

/// Exponential backoff with jitter.
///
/// `initial_ms = 0` disables the delay entirely, so failed cycles restart
/// immediately.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackoffConfig {
	/// First delay in milliseconds.
	#[serde(default = "default_backoff_initial_ms")]
	pub initial_ms: u64,
	/// Upper bound for any delay in milliseconds.
	#[serde(default = "default_backoff_max_ms")]
	pub max_ms: u64,
	/// Growth factor between consecutive delays.
	#[serde(default = "default_backoff_multiplier")]
	pub multiplier: f64,
	/// Jitter as a fraction of the delay, in `[0, 1]`.
	#[serde(default = "default_backoff_randomization")]
	pub randomization_factor: f64,
}

fn default_backoff_initial_ms() -> u64 {
	250
}

fn default_backoff_max_ms() -> u64 {
	10_000
}

fn default_backoff_multiplier() -> f64 {
	2.0
}

fn default_backoff_randomization() -> f64 {
	0.5
}

impl BackoffConfig {
	/// Backoff policy described by this section.
	pub fn policy(&self) -> BackoffPolicy {
		BackoffPolicy {
			initial: Duration::from_millis(self.initial_ms),
			max: Duration::from_millis(self.max_ms),
			multiplier: self.multiplier,
			randomization_factor: self.randomization_factor,
		}
	}
}

impl Default for BackoffConfig {
	fn default() -> Self {
		Self {
			initial_ms: default_backoff_initial_ms(),
			max_ms: default_backoff_max_ms(),
			multiplier: default_backoff_multiplier(),
			randomization_factor: default_backoff_randomization(),
		}
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	// Limit input size to prevent ReDoS attacks
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Builds a configuration with all defaults for the given network root.
	pub fn for_root(root: impl Into<String>) -> Result<Self, ConfigError> {
		let config = Self {
			load: LoadConfig::default(),
			network: NetworkConfig { root: root.into() },
			http: HttpConfig::default(),
			tools: ToolsConfig::default(),
			delivery: DeliveryConfig::default(),
			provision: ProvisionConfig::default(),
			backoff: BackoffConfig::default(),
		};
		config.validate()?;
		Ok(config)
	}

	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Validates the configuration to ensure all values are usable.
	///
	/// Called automatically when parsing. Callers that modify a parsed
	/// configuration (for example with command-line overrides) should call it
	/// again before use.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.load.workers == 0 {
			return Err(ConfigError::Validation(
				"load.workers must be at least 1".into(),
			));
		}
		if self.load.workers > 10_000 {
			return Err(ConfigError::Validation(
				"load.workers cannot exceed 10000".into(),
			));
		}
		if !self.load.fee.is_finite() || self.load.fee < 0.0 {
			return Err(ConfigError::Validation(format!(
				"load.fee must be a non-negative number, got {}",
				self.load.fee
			)));
		}
		if !self.load.stable_amount.is_finite() || self.load.stable_amount <= 0.0 {
			return Err(ConfigError::Validation(format!(
				"load.stable_amount must be positive, got {}",
				self.load.stable_amount
			)));
		}

		self.network.endpoints()?;

		if self.http.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"http.timeout_seconds must be greater than 0".into(),
			));
		}

		if self.tools.agd.trim().is_empty() || self.tools.quote.trim().is_empty() {
			return Err(ConfigError::Validation(
				"tools.agd and tools.quote cannot be empty".into(),
			));
		}

		if self.delivery.confirmation_attempts == 0 {
			return Err(ConfigError::Validation(
				"delivery.confirmation_attempts must be at least 1".into(),
			));
		}

		if !self.provision.faucet_path.starts_with('/') {
			return Err(ConfigError::Validation(format!(
				"provision.faucet_path must start with '/', got '{}'",
				self.provision.faucet_path
			)));
		}

		if self.backoff.max_ms < self.backoff.initial_ms {
			return Err(ConfigError::Validation(
				"backoff.max_ms cannot be smaller than backoff.initial_ms".into(),
			));
		}
		if self.backoff.multiplier.is_nan() || self.backoff.multiplier < 1.0 {
			return Err(ConfigError::Validation(
				"backoff.multiplier must be at least 1.0".into(),
			));
		}
		if !(0.0..=1.0).contains(&self.backoff.randomization_factor) {
			return Err(ConfigError::Validation(
				"backoff.randomization_factor must be within [0, 1]".into(),
			));
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("PSMLOAD_TEST_HOST", "ollinet.agoric.net");
		std::env::set_var("PSMLOAD_TEST_PORT", "443");

		let input = "root = \"https://${PSMLOAD_TEST_HOST}:${PSMLOAD_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "root = \"https://ollinet.agoric.net:443\"");

		std::env::remove_var("PSMLOAD_TEST_HOST");
		std::env::remove_var("PSMLOAD_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${PSMLOAD_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${PSMLOAD_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("PSMLOAD_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_uses_defaults() {
		let config: Config = r#"
[network]
root = "https://ollinet.agoric.net:443"
"#
		.parse()
		.unwrap();

		assert_eq!(config.load.workers, 10);
		assert_eq!(config.load.fee, 0.011);
		assert_eq!(config.delivery.confirmation_attempts, 50);
		assert_eq!(
			config.delivery.confirmation_interval(),
			Duration::from_millis(500)
		);
		assert_eq!(
			config.delivery.key_not_found_cooldown(),
			Duration::from_secs(10)
		);
		assert!(!config.delivery.retry_after_provision);
		assert!(!config.provision.enabled);
		assert_eq!(config.tools.quote_env["NODE_NO_WARNINGS"], "1");
		assert_eq!(config.tools.quote, "node");
		assert_eq!(config.tools.quote_script, "psm-tool.js");
		assert_eq!(config.load.stable_amount, 0.01);

		let policy = config.http.retry_policy();
		assert_eq!(policy.max_retries, 10);
		assert_eq!(policy.min_wait, Duration::from_secs(3));
		assert_eq!(policy.timeout, Duration::from_secs(120));
	}

	#[test]
	fn test_full_config() {
		std::env::set_var("PSMLOAD_TEST_STATE_DIR", "/tmp/psmload-state");

		let config: Config = r#"
[load]
workers = 3
fee = 0.02
stable_amount = 2.5
state_dir = "${PSMLOAD_TEST_STATE_DIR}"

[network]
root = "https://devnet.agoric.net"

[tools]
agd = "/usr/local/bin/agd"
quote = "node"
quote_script = "/opt/agoric/psm-tool.js"

[http]
timeout_seconds = 30

[delivery]
confirmation_attempts = 10
retry_after_provision = true

[provision]
enabled = true

[backoff]
initial_ms = 0
max_ms = 0
"#
		.parse()
		.unwrap();

		assert_eq!(config.load.workers, 3);
		assert_eq!(
			config.load.state_dir,
			Some(PathBuf::from("/tmp/psmload-state"))
		);
		assert_eq!(config.tools.keyring_backend, "test");
		assert_eq!(config.tools.quote_script, "/opt/agoric/psm-tool.js");
		assert_eq!(config.delivery.confirmation_attempts, 10);
		assert!(config.delivery.retry_after_provision);
		assert!(config.provision.enabled);
		assert_eq!(config.provision.faucet_path, "/go");
		assert!(config.backoff.policy().initial.is_zero());
		assert_eq!(config.http.retry_policy().timeout, Duration::from_secs(30));
		let endpoints = config.network.endpoints().unwrap();
		assert_eq!(endpoints.api, "https://devnet.api.agoric.net");

		std::env::remove_var("PSMLOAD_TEST_STATE_DIR");
	}

	#[test]
	fn test_zero_workers_rejected() {
		let result: Result<Config, _> = r#"
[load]
workers = 0

[network]
root = "https://ollinet.agoric.net:443"
"#
		.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_invalid_root_rejected() {
		let result = Config::for_root("localhost");
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_inverted_backoff_rejected() {
		let result: Result<Config, _> = r#"
[network]
root = "https://ollinet.agoric.net:443"

[backoff]
initial_ms = 5000
max_ms = 100
"#
		.parse();
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("psmload.toml");
		std::fs::write(
			&path,
			"[network]\nroot = \"https://ollinet.agoric.net:443\"\n[load]\nworkers = 4\n",
		)
		.unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.load.workers, 4);

		let missing = Config::from_file(dir.path().join("missing.toml")).await;
		assert!(matches!(missing, Err(ConfigError::Io(_))));
	}
}
