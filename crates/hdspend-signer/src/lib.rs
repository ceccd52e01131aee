//! hdspend Transaction Signing
//!
//! Builds and signs spend transactions from wallet-selected outputs:
//!
//! - [`SigningInputAssembler`] merges a [`SigningCandidate`] with replay
//!   protection parameters fetched from the network
//! - [`TransactionSigner`] validates addresses, lays out inputs and outputs,
//!   signs every wallet input and serializes the result
//! - [`SigningOrchestrator`] runs both in sequence
//!
//! [`SigningCandidate`]: hdspend_core::SigningCandidate

pub mod assembler;
pub mod orchestrator;
pub mod plan;
pub mod replay;
pub mod sighash;
pub mod signer;

pub use assembler::SigningInputAssembler;
pub use orchestrator::SigningOrchestrator;
pub use plan::TransactionPlan;
pub use replay::{ReplayProtectionProvider, ReplayProtectionSource};
pub use signer::TransactionSigner;

use hdspend_core::{AddressError, NetworkError};
use thiserror::Error;

/// Errors from signing a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("Invalid destination address: {0}")]
    InvalidDestinationAddress(AddressError),

    #[error("Invalid change address: {0}")]
    InvalidChangeAddress(AddressError),

    #[error("Signing failed: {0}")]
    SigningFailure(String),

    #[error("Replay protection lookup failed: {0}")]
    ReplayProtection(#[from] NetworkError),
}
