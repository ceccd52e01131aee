//! Address usage lookups

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hdspend_core::{DerivedAddress, NetworkError};

/// A data source that reports per-address usage.
///
/// One call is one network round trip for the whole batch. Results may come
/// back in any order, and addresses the source has never seen may be left out.
#[async_trait]
pub trait AddressUsageSource: Send + Sync {
    async fn fetch_usage(&self, addresses: &[String]) -> Result<Vec<DerivedAddress>, NetworkError>;
}

/// Maps a batch of addresses to their transaction counts
#[derive(Clone)]
pub struct AddressUsageProbe {
    source: Arc<dyn AddressUsageSource>,
}

impl AddressUsageProbe {
    pub fn new(source: Arc<dyn AddressUsageSource>) -> Self {
        Self { source }
    }

    /// Transaction count per address, aligned with `addresses`.
    ///
    /// Addresses missing from the response count as unused. An empty batch
    /// makes no request.
    pub async fn probe(&self, addresses: &[String]) -> Result<Vec<u64>, NetworkError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let reported = self.source.fetch_usage(addresses).await?;
        let counts: HashMap<&str, u64> = reported
            .iter()
            .map(|a| (a.address.as_str(), a.transaction_count))
            .collect();

        Ok(addresses
            .iter()
            .map(|a| counts.get(a.as_str()).copied().unwrap_or(0))
            .collect())
    }
}
