//! Chain metadata from the network's status page.
//!
//! The network root serves a plain-text page that contains a `Chain: <id>`
//! line.

use crate::{ChainInfoInterface, DeliveryError};
use async_trait::async_trait;
use load_types::{capture, HttpClient};
use once_cell::sync::Lazy;
use regex::Regex;

static CHAIN_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?m)Chain: (.+?)$").expect("valid chain pattern"));

/// Extracts the chain id from the status page body.
pub fn parse_chain_id(page: &str) -> Option<String> {
	capture(&CHAIN_PATTERN, page)
}

/// Chain info source reading the status page at the network root.
pub struct StatusPageChainInfo {
	client: HttpClient,
	root: String,
}

impl StatusPageChainInfo {
	/// Creates a source reading the page at `root`.
	pub fn new(client: HttpClient, root: impl Into<String>) -> Self {
		Self {
			client,
			root: root.into(),
		}
	}
}

#[async_trait]
impl ChainInfoInterface for StatusPageChainInfo {
	async fn fetch_chain_id(&self) -> Result<String, DeliveryError> {
		let response = self
			.client
			.get(&self.root)
			.await
			.map_err(|e| DeliveryError::ChainIdUnavailable(e.to_string()))?;
		let page = response
			.text()
			.await
			.map_err(|e| DeliveryError::ChainIdUnavailable(e.to_string()))?;

		parse_chain_id(&page).ok_or_else(|| {
			DeliveryError::ChainIdUnavailable(format!("no chain id on {}", self.root))
		})
	}
}
