//! Replay protection parameter lookup

use std::sync::Arc;

use async_trait::async_trait;
use hdspend_core::{NetworkError, ReplayProtectionParameters};

/// A data source for replay protection parameters (one round trip per call)
#[async_trait]
pub trait ReplayProtectionSource: Send + Sync {
    async fn fetch_replay_protection(&self) -> Result<ReplayProtectionParameters, NetworkError>;
}

/// Fetches fresh replay protection parameters for every signing.
///
/// Nothing is cached: each bound output can only be spent once.
#[derive(Clone)]
pub struct ReplayProtectionProvider {
    source: Arc<dyn ReplayProtectionSource>,
}

impl ReplayProtectionProvider {
    pub fn new(source: Arc<dyn ReplayProtectionSource>) -> Self {
        Self { source }
    }

    pub async fn fetch_replay_protection_parameters(
        &self,
    ) -> Result<ReplayProtectionParameters, NetworkError> {
        let params = self.source.fetch_replay_protection().await?;
        log::debug!(
            "Replay protection bound to {}:{}",
            params.bound_output.transaction_hash,
            params.bound_output.output_index
        );
        Ok(params)
    }
}
