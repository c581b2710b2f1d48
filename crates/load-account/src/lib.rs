//! Identity management module for the psmload system.
//!
//! This module provides the keyring abstraction used to create worker
//! identities and the [`IdentityPool`] that holds them for the lifetime of a
//! run. Identities are created strictly one at a time and frozen before any
//! worker starts.

use async_trait::async_trait;
use load_types::{key_name_for, Identity};
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod agd;
}

/// Errors that can occur during identity operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// The key-management tool could not be run or exited with an error.
	#[error("Key tool failed for {key_name}: {message}")]
	ToolFailed { key_name: String, message: String },
	/// The tool ran but its output contained no address.
	#[error("No address found in key tool output for {key_name}")]
	AddressNotFound { key_name: String },
}

/// Trait defining the interface for keyring implementations.
///
/// A keyring creates (or recovers) the key named `key_name` in its keystore
/// and returns the address derived from it. Implementations are not required
/// to tolerate concurrent calls; [`IdentityPool::create`] never makes them.
#[async_trait]
pub trait KeyringInterface: Send + Sync {
	/// Creates the key `key_name` and returns its address.
	async fn create_identity(&self, key_name: &str) -> Result<String, AccountError>;
}

/// Frozen set of worker identities.
///
/// Identity `i` belongs to worker `i`. The pool is immutable once created and
/// cheap to clone; clones share the same backing slice.
#[derive(Debug, Clone)]
pub struct IdentityPool {
	identities: Arc<[Identity]>,
}

impl IdentityPool {
	/// Creates `count` identities, one keyring call at a time.
	///
	/// Any failure aborts the whole operation: a worker without a key cannot
	/// run, so a partial pool is never returned.
	pub async fn create(
		keyring: &dyn KeyringInterface,
		count: usize,
	) -> Result<Self, AccountError> {
		let mut identities = Vec::with_capacity(count);

		for index in 0..count {
			let key_name = key_name_for(index);
			match keyring.create_identity(&key_name).await {
				Ok(address) => {
					tracing::info!(worker = index, key = %key_name, address = %address, "Created identity");
					identities.push(Identity {
						index,
						address,
						key_name,
					});
				},
				Err(e) => {
					tracing::error!(worker = index, key = %key_name, error = %e, "Failed to create identity");
					return Err(e);
				},
			}
		}

		Ok(Self {
			identities: identities.into(),
		})
	}

	/// Wraps identities that were created elsewhere.
	pub fn from_identities(identities: Vec<Identity>) -> Self {
		Self {
			identities: identities.into(),
		}
	}

	/// Returns the identity owned by worker `index`.
	pub fn get(&self, index: usize) -> Option<&Identity> {
		self.identities.get(index)
	}

	/// Number of identities in the pool.
	pub fn len(&self) -> usize {
		self.identities.len()
	}

	/// Whether the pool is empty.
	pub fn is_empty(&self) -> bool {
		self.identities.is_empty()
	}

	/// Iterates identities in worker order.
	pub fn iter(&self) -> impl Iterator<Item = &Identity> {
		self.identities.iter()
	}

	/// Shared handle to the frozen identity slice.
	pub fn shared(&self) -> Arc<[Identity]> {
		Arc::clone(&self.identities)
	}
}
