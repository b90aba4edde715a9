use thiserror::Error;

use crate::store::StoreError;

/// Error taxonomy for the procurement subsystem.
///
/// Validation, authorization, state-conflict, window and duplicate errors are
/// returned synchronously and never retried; the caller must correct its
/// input or refresh state. `AlreadyAwarded` means a concurrent award on the
/// same RFP won; the caller should reload the now-closed RFP.
#[derive(Debug, Error)]
pub enum ProcurementError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not permitted: {0}")]
    Authorization(String),

    #[error("invalid state transition: {0}")]
    StateConflict(String),

    #[error("the bidding window for this RFP is closed")]
    WindowClosed,

    #[error("developer already has a submitted bid on this RFP")]
    DuplicateBid,

    #[error("RFP has already been awarded")]
    AlreadyAwarded,

    #[error("storage operation failed (retryable: {retryable})")]
    OperationFailed { retryable: bool },
}

impl ProcurementError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn state_conflict(msg: impl Into<String>) -> Self {
        Self::StateConflict(msg.into())
    }
}

impl From<StoreError> for ProcurementError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "Store unavailable");
                Self::OperationFailed { retryable: true }
            }
            // Reached only through the one-live-bid constraint; the award
            // coordinator handles its project-per-award index itself.
            StoreError::UniqueViolation => Self::DuplicateBid,
            StoreError::Decode(msg) => {
                tracing::error!(error = %msg, "Undecodable row in store");
                Self::OperationFailed { retryable: false }
            }
        }
    }
}

pub type ProcurementResult<T> = Result<T, ProcurementError>;
