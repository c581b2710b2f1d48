//! Worker identity types.
//!
//! An identity is the on-chain account a worker signs with: a key held in the
//! local keystore plus the address derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A worker's on-chain account.
///
/// Created once per worker slot during pool creation and never mutated
/// afterwards. Identity `index` is used exclusively by worker `index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
	/// Worker slot this identity belongs to.
	pub index: usize,
	/// Bech32 address reported by the key-management tool.
	pub address: String,
	/// Name of the key in the local keystore.
	pub key_name: String,
}

impl Identity {
	/// Creates an identity for worker `index`, using the conventional key name.
	pub fn new(index: usize, address: impl Into<String>) -> Self {
		Self {
			index,
			address: address.into(),
			key_name: key_name_for(index),
		}
	}
}

impl fmt::Display for Identity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.key_name, self.address)
	}
}

/// Returns the keystore name used for worker `index`.
pub fn key_name_for(index: usize) -> String {
	format!("key{}", index)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_key_name_follows_index() {
		let identity = Identity::new(7, "agoric1abc");
		assert_eq!(identity.key_name, "key7");
		assert_eq!(identity.index, 7);
		assert_eq!(identity.to_string(), "key7 (agoric1abc)");
	}
}
