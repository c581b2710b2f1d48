//! Main entry point for the psmload service.
//!
//! This binary drives a pool of worker identities through continuous buy and
//! sell cycles against the PSM contract of an Agoric network. Configuration
//! comes from an optional TOML file; the most common settings can be
//! overridden on the command line, so the binary also runs without a file.

use clap::Parser;
use load_config::builders::config::ConfigBuilder;
use load_config::{Config, ConfigError};
use load_core::{LoadBuilder, LoadComponents, LoadEngine};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod observer;

// Import implementations from individual crates
use load_account::implementations::agd::AgdKeyring;
use load_delivery::implementations::agd::AgdLedger;
use load_delivery::implementations::rest::RestTxStatus;
use load_delivery::implementations::status_page::StatusPageChainInfo;
use load_offer::implementations::cli::CliQuote;
use load_provision::implementations::http::HttpFaucet;
use load_types::HttpClient;

/// Network targeted when neither a config file nor `--instagoric` names one.
const DEFAULT_ROOT: &str = "https://ollinet.agoric.net:443";

/// Command-line arguments for the psmload service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Number of smart wallet workers
	#[arg(short, long, env = "PSMLOAD_WORKERS")]
	workers: Option<usize>,

	/// Network root, e.g. https://ollinet.agoric.net:443
	#[arg(long, env = "PSMLOAD_INSTAGORIC")]
	instagoric: Option<String>,

	/// Fee to pay, e.g. 0.011
	#[arg(long)]
	fee: Option<f64>,

	/// Directory to keep state in and resume from
	#[arg(long)]
	statedir: Option<PathBuf>,

	/// Provision every wallet through the faucet before starting
	#[arg(long)]
	provision: bool,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the psmload service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration and applies overrides
/// 4. Builds the load engine with all implementations
/// 5. Runs the workers until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started psmload");

	let config = load_config(&args).await?;
	tracing::info!(
		root = %config.network.root,
		workers = config.load.workers,
		fee = config.load.fee,
		"Loaded configuration"
	);

	// Without a state directory, keys live in a scratch keystore removed on exit.
	let scratch = match &config.load.state_dir {
		Some(_) => None,
		None => Some(tempfile::Builder::new().prefix("agoric_").tempdir()?),
	};
	let home = config
		.load
		.state_dir
		.clone()
		.or_else(|| scratch.as_ref().map(|dir| dir.path().to_path_buf()))
		.ok_or("no keystore directory")?;

	let cancel = CancellationToken::new();
	spawn_shutdown_listener(cancel.clone());

	let engine = build_engine(config, &home, &cancel).await?;
	let counter = observer::spawn(engine.event_bus());

	let summary = engine.run(cancel).await?;
	drop(engine);
	let totals = counter.await?;

	tracing::info!(
		workers = summary.workers,
		cycles = summary.cycles,
		completed = totals.completed,
		failed = totals.failed,
		unconfirmed = totals.unconfirmed,
		"Stopped psmload"
	);
	Ok(())
}

/// Loads the configuration file, if any, and applies command-line overrides.
async fn load_config(args: &Args) -> Result<Config, ConfigError> {
	let base = match &args.config {
		Some(path) => Config::from_file(path).await?,
		None => Config::for_root(args.instagoric.as_deref().unwrap_or(DEFAULT_ROOT))?,
	};

	let mut builder = ConfigBuilder::from_config(base);
	if let Some(root) = &args.instagoric {
		builder = builder.root(root.clone());
	}
	if let Some(workers) = args.workers {
		builder = builder.workers(workers);
	}
	if let Some(fee) = args.fee {
		builder = builder.fee(fee);
	}
	if let Some(dir) = &args.statedir {
		builder = builder.state_dir(Some(dir.clone()));
	}
	if args.provision {
		builder = builder.provision(true);
	}

	let config = builder.build();
	config.validate()?;
	Ok(config)
}

/// Builds the load engine with the subprocess and HTTP implementations.
async fn build_engine(
	config: Config,
	home: &Path,
	cancel: &CancellationToken,
) -> Result<LoadEngine, Box<dyn std::error::Error>> {
	let endpoints = config.network.endpoints()?;
	let http = HttpClient::new(config.http.retry_policy())?;
	let tools = &config.tools;

	let components = LoadComponents {
		keyring: Box::new(AgdKeyring::new(
			&tools.agd,
			&tools.keyring_backend,
			Some(home.to_path_buf()),
		)),
		quote: Box::new(CliQuote::new(
			&tools.quote,
			Some(tools.quote_script.clone()),
			tools.quote_env.clone(),
		)),
		ledger: Box::new(AgdLedger::new(
			&tools.agd,
			&tools.keyring_backend,
			Some(home.to_path_buf()),
		)),
		tx_status: Box::new(RestTxStatus::new(http.clone(), endpoints.api.clone())),
		chain_info: Box::new(StatusPageChainInfo::new(
			http.clone(),
			endpoints.root.clone(),
		)),
		faucet: Box::new(HttpFaucet::new(
			http,
			&endpoints.faucet,
			&config.provision.faucet_path,
		)),
	};

	Ok(LoadBuilder::new(config).build(components, cancel).await?)
}

/// Cancels `cancel` on Ctrl-C.
fn spawn_shutdown_listener(cancel: CancellationToken) {
	spawn_cancel_on(cancel, tokio::signal::ctrl_c());
}

/// Cancels `cancel` once `signal` resolves successfully.
///
/// A signal that cannot be installed leaves the run going; it can then only
/// be stopped from outside the process.
fn spawn_cancel_on<F>(cancel: CancellationToken, signal: F) -> JoinHandle<()>
where
	F: Future<Output = std::io::Result<()>> + Send + 'static,
{
	tokio::spawn(async move {
		match signal.await {
			Ok(()) => {
				tracing::info!("Shutdown requested");
				cancel.cancel();
			},
			Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
		}
	})
}
