//! Network configuration types for the load generator.
//!
//! A network is addressed through a single root URL (for example
//! `https://ollinet.agoric.net:443`). Every service the load generator talks
//! to lives on a sibling host derived from that root by inserting a service
//! token after the first host label.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while deriving network endpoints.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
	/// The root URL does not have the `scheme://label.domain` shape.
	#[error("Invalid network root '{0}': expected scheme://name.domain[:port]")]
	InvalidRoot(String),
}

/// Services exposed by a network, each on its own subdomain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
	/// Tendermint RPC endpoint used by the ledger tool.
	Rpc,
	/// Cosmos REST API used for transaction status.
	Api,
	/// Faucet used to provision smart wallets.
	Faucet,
}

impl Service {
	/// Subdomain token for this service.
	pub fn token(&self) -> &'static str {
		match self {
			Service::Rpc => "rpc",
			Service::Api => "api",
			Service::Faucet => "faucet",
		}
	}
}

/// Derives the URL of `service` from the network root.
///
/// `https://ollinet.agoric.net:443` becomes `https://ollinet.rpc.agoric.net:443`
/// for [`Service::Rpc`]. Any path on the root is dropped.
pub fn derive_service_url(root: &str, service: Service) -> Result<String, NetworkError> {
	let invalid = || NetworkError::InvalidRoot(root.to_string());

	let (scheme, rest) = root.split_once("://").ok_or_else(invalid)?;
	if scheme.is_empty() {
		return Err(invalid());
	}
	let authority = rest.split('/').next().unwrap_or_default();
	let (label, domain) = authority.split_once('.').ok_or_else(invalid)?;
	if label.is_empty() || domain.is_empty() || domain.starts_with(':') {
		return Err(invalid());
	}

	Ok(format!(
		"{}://{}.{}.{}",
		scheme,
		label,
		service.token(),
		domain
	))
}

/// Service URLs derived from a single network root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoints {
	/// The network root; serves the chain status page.
	pub root: String,
	/// Tendermint RPC endpoint.
	pub rpc: String,
	/// Cosmos REST API root.
	pub api: String,
	/// Faucet root.
	pub faucet: String,
}

impl ServiceEndpoints {
	/// Derives every service endpoint from `root`.
	pub fn from_root(root: &str) -> Result<Self, NetworkError> {
		let root = root.trim_end_matches('/');
		Ok(Self {
			root: root.to_string(),
			rpc: derive_service_url(root, Service::Rpc)?,
			api: derive_service_url(root, Service::Api)?,
			faucet: derive_service_url(root, Service::Faucet)?,
		})
	}
}

/// Network descriptor handed to the quoting tool as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
	/// RPC endpoint.
	pub rpc: String,
	/// Chain identifier; empty when not yet resolved.
	#[serde(rename = "chainId")]
	pub chain_id: String,
}

impl NetworkDescriptor {
	/// Serializes the descriptor to the compact JSON form the tool expects.
	pub fn to_json(&self) -> String {
		serde_json::json!({ "rpc": self.rpc, "chainId": self.chain_id }).to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_derive_keeps_scheme_and_port() {
		let url = derive_service_url("https://ollinet.agoric.net:443", Service::Rpc).unwrap();
		assert_eq!(url, "https://ollinet.rpc.agoric.net:443");
	}

	#[test]
	fn test_derive_drops_path() {
		let url = derive_service_url("https://devnet.agoric.net/status", Service::Api).unwrap();
		assert_eq!(url, "https://devnet.api.agoric.net");
	}

	#[test]
	fn test_derive_rejects_single_label_host() {
		assert!(derive_service_url("http://localhost:26657", Service::Rpc).is_err());
		assert!(derive_service_url("ollinet.agoric.net", Service::Rpc).is_err());
	}

	#[test]
	fn test_endpoints_from_root() {
		let endpoints = ServiceEndpoints::from_root("https://ollinet.agoric.net:443/").unwrap();
		assert_eq!(endpoints.root, "https://ollinet.agoric.net:443");
		assert_eq!(endpoints.rpc, "https://ollinet.rpc.agoric.net:443");
		assert_eq!(endpoints.api, "https://ollinet.api.agoric.net:443");
		assert_eq!(endpoints.faucet, "https://ollinet.faucet.agoric.net:443");
	}

	#[test]
	fn test_descriptor_json_shape() {
		let descriptor = NetworkDescriptor {
			rpc: "https://ollinet.rpc.agoric.net:443".into(),
			chain_id: "agoricollinet-21".into(),
		};
		let value: serde_json::Value = serde_json::from_str(&descriptor.to_json()).unwrap();
		assert_eq!(value["rpc"], "https://ollinet.rpc.agoric.net:443");
		assert_eq!(value["chainId"], "agoricollinet-21");
	}
}
