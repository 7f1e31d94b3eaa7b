//! Ledger errors
//!
//! Conflicts and misses are not errors: they come back as `None` or `false`.
//! Only rejected arguments and failed persistence are.

use keygate_store::StoreError;

/// Result alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors raised by ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// An argument was rejected before any state changed
    #[error("invalid {field}: {reason}")]
    InvalidArgument {
        /// Name of the rejected argument
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Persisting the new state failed; memory and disk keep the prior version
    #[error("storage unavailable: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}
