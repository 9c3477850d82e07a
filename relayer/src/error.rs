//! Process-level error type.

use thiserror::Error;

use crate::amount::AmountConversionError;
use crate::coreum::ContractError;
use crate::xrpl::LedgerError;

#[derive(Debug, Error)]
pub enum RelayerError {
    /// Cooperative shutdown; the supervisor treats this as a clean exit.
    #[error("process cancelled")]
    Cancelled,
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Conversion(#[from] AmountConversionError),
    /// An operation that matches none of the known shapes. Loud by design:
    /// the contract should never emit one.
    #[error("malformed operation: {0}")]
    MalformedOperation(String),
    #[error("invalid relayer registry entry: {0}")]
    SignerRegistry(String),
    #[error("bridge account must carry exactly one signer list, found {0}")]
    SignerListCount(usize),
    #[error("submission failed with preliminary result {0}")]
    SubmissionFailure(String),
    #[error("process {process} panicked: {message}")]
    Panicked { process: String, message: String },
}

impl RelayerError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
