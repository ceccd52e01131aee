//! hdspend Account Discovery
//!
//! Finds how many HD accounts of a wallet have been used on-chain, so a
//! restored wallet shows (and keeps deriving) the right number of accounts.
//!
//! # Example
//!
//! ```ignore
//! use hdspend_discovery::{AccountDiscovery, DEFAULT_BATCH_SIZE};
//!
//! let discovery = AccountDiscovery::new(Arc::new(api_client));
//! let used = discovery.discover_accounts(DEFAULT_BATCH_SIZE, &deriver).await?;
//! ```

pub mod engine;
pub mod probe;


pub use engine::{AccountDiscovery, DEFAULT_BATCH_SIZE};
pub use probe::{AddressUsageProbe, AddressUsageSource};

use hdspend_core::{KeyError, NetworkError};
use thiserror::Error;

/// Errors from account discovery
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Usage lookup failed: {0}")]
    Network(#[from] NetworkError),

    #[error("Derivation failed: {0}")]
    Derivation(String),

    #[error("Batch size must be at least 1")]
    InvalidBatchSize,
}

impl From<KeyError> for DiscoveryError {
    fn from(e: KeyError) -> Self {
        DiscoveryError::Derivation(e.to_string())
    }
}
