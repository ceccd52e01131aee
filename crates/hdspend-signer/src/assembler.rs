//! Signing input assembly

use hdspend_core::{NetworkError, SigningCandidate, SigningInput};

use crate::replay::ReplayProtectionProvider;

/// Merges a candidate with freshly fetched replay protection parameters.
///
/// Chains without replay protection are assembled with no provider and make
/// no network call.
#[derive(Clone)]
pub struct SigningInputAssembler {
    replay_protection: Option<ReplayProtectionProvider>,
}

impl SigningInputAssembler {
    pub fn new(replay_protection: Option<ReplayProtectionProvider>) -> Self {
        Self { replay_protection }
    }

    pub fn without_replay_protection() -> Self {
        Self::new(None)
    }

    pub fn requires_replay_protection(&self) -> bool {
        self.replay_protection.is_some()
    }

    pub async fn assemble(&self, candidate: SigningCandidate) -> Result<SigningInput, NetworkError> {
        let replay_protection = match &self.replay_protection {
            Some(provider) => Some(provider.fetch_replay_protection_parameters().await?),
            None => None,
        };
        Ok(SigningInput::new(candidate, replay_protection))
    }
}
