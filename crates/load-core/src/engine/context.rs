//! Shared chain context for all workers.
//!
//! The context is built once before the workers start and is read-only
//! afterwards. The chain id is either known at construction or resolved
//! lazily on first use.

use load_delivery::{ChainInfoInterface, DeliveryError};
use load_types::{NetworkDescriptor, ServiceEndpoints};
use tokio::sync::OnceCell;

/// Endpoints, board id and the lazily resolved chain id.
pub struct ChainContext {
	endpoints: ServiceEndpoints,
	board_id: String,
	chain_id: OnceCell<String>,
	chain_info: Box<dyn ChainInfoInterface>,
}

impl ChainContext {
	/// Creates a context for a resolved board id; the chain id is looked up later.
	pub fn new(
		endpoints: ServiceEndpoints,
		board_id: impl Into<String>,
		chain_info: Box<dyn ChainInfoInterface>,
	) -> Self {
		Self {
			endpoints,
			board_id: board_id.into(),
			chain_id: OnceCell::new(),
			chain_info,
		}
	}

	/// Creates a context whose chain id is already resolved.
	///
	/// `chain_info` is kept but never consulted while the id is cached.
	pub fn with_chain_id(
		endpoints: ServiceEndpoints,
		board_id: impl Into<String>,
		chain_id: impl Into<String>,
		chain_info: Box<dyn ChainInfoInterface>,
	) -> Self {
		Self {
			endpoints,
			board_id: board_id.into(),
			chain_id: OnceCell::new_with(Some(chain_id.into())),
			chain_info,
		}
	}

	/// Service endpoints of the target network.
	pub fn endpoints(&self) -> &ServiceEndpoints {
		&self.endpoints
	}

	/// Board id of the target contract.
	pub fn board_id(&self) -> &str {
		&self.board_id
	}

	/// Returns the chain id, resolving it on first use.
	///
	/// Only one resolution is in flight at a time; concurrent callers wait for
	/// it. A failed resolution is returned to its caller and not cached, so the
	/// next call tries again.
	pub async fn chain_id(&self) -> Result<&str, DeliveryError> {
		self.chain_id
			.get_or_try_init(|| async {
				let chain_id = self.chain_info.fetch_chain_id().await?;
				tracing::info!(chain_id = %chain_id, "Resolved chain id");
				Ok::<_, DeliveryError>(chain_id)
			})
			.await
			.map(String::as_str)
	}

	/// Network descriptor handed to the quoting tool.
	pub fn network(&self, chain_id: &str) -> NetworkDescriptor {
		NetworkDescriptor {
			rpc: self.endpoints.rpc.clone(),
			chain_id: chain_id.to_string(),
		}
	}
}
