//! Assemble-then-sign entry point

use std::sync::Arc;

use hdspend_core::{ChainParams, SigningCandidate, SigningOutput};

use crate::assembler::SigningInputAssembler;
use crate::replay::{ReplayProtectionProvider, ReplayProtectionSource};
use crate::signer::TransactionSigner;
use crate::SigningError;

/// Runs [`SigningInputAssembler`] then [`TransactionSigner`]
pub struct SigningOrchestrator {
    assembler: SigningInputAssembler,
    signer: TransactionSigner,
}

impl SigningOrchestrator {
    pub fn new(assembler: SigningInputAssembler, signer: TransactionSigner) -> Self {
        Self { assembler, signer }
    }

    /// Wire up a signer for `params`.
    ///
    /// `replay_source` is only used when the chain needs replay protection.
    pub fn for_chain(
        params: ChainParams,
        replay_source: Option<Arc<dyn ReplayProtectionSource>>,
    ) -> Self {
        let provider = replay_source
            .filter(|_| params.replay_protection)
            .map(ReplayProtectionProvider::new);
        Self::new(
            SigningInputAssembler::new(provider),
            TransactionSigner::new(params),
        )
    }

    pub fn params(&self) -> &ChainParams {
        self.signer.params()
    }

    /// Assemble and sign `candidate`.
    ///
    /// Dropping the future before assembly finishes has no effect. There is
    /// no await point after assembly, so signing always runs to completion.
    pub async fn sign(&self, candidate: SigningCandidate) -> Result<SigningOutput, SigningError> {
        let input = self.assembler.assemble(candidate).await?;
        self.signer.sign(input)
    }
}
