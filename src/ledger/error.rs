use std::fmt;
use uuid::Uuid;

/// Failures reported by a [`crate::store::LedgerStore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Concurrent writers could not be serialized; the unit of work may be retried.
    Conflict(String),
    /// Transport or infrastructure failure.
    Unavailable(String),
    /// A value could not be written in the store's representation.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "Write conflict: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "Invalid stored value: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Non-positive or non-numeric amount. Raised before the store is touched.
    InvalidAmount(String),
    InvalidRequest(String),
    RequestNotFound(Uuid),
    BusinessNotFound(Uuid),
    /// The store kept rejecting the write as conflicting until the retry budget ran out.
    /// Nothing was recorded; callers may retry.
    ConflictRetryExhausted(String),
    StoreUnavailable(String),
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::ConflictRetryExhausted(_) | LedgerError::StoreUnavailable(_)
        )
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            LedgerError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            LedgerError::RequestNotFound(id) => write!(f, "Funding request not found: {}", id),
            LedgerError::BusinessNotFound(id) => write!(f, "Business not found: {}", id),
            LedgerError::ConflictRetryExhausted(msg) => {
                write!(f, "Could not record transaction after retrying conflicts: {}", msg)
            }
            LedgerError::StoreUnavailable(msg) => write!(f, "Ledger store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => LedgerError::ConflictRetryExhausted(msg),
            StoreError::Unavailable(msg) | StoreError::Corrupt(msg) => LedgerError::StoreUnavailable(msg),
        }
    }
}
