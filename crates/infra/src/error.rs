//! Service-level error: domain failures plus infrastructure failures.

use thiserror::Error;

use stockflow_core::DomainError;

use crate::store::StoreError;

pub type StockResult<T> = Result<T, StockError>;

#[derive(Debug, Error)]
pub enum StockError {
    /// Deterministic business failure (including lost optimistic races).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store failed for reasons unrelated to the request.
    #[error("record store failure: {0}")]
    Store(StoreError),
}

impl StockError {
    /// Whether a caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            StockError::Domain(err) => err.is_retryable(),
            StockError::Store(_) => false,
        }
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            StockError::Domain(err) => Some(err),
            StockError::Store(_) => None,
        }
    }

    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, StockError::Domain(DomainError::Conflict(_)))
    }
}

impl From<StoreError> for StockError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => StockError::Domain(DomainError::Conflict(msg)),
            StoreError::NotFound(what) => StockError::Domain(DomainError::NotFound(what)),
            other => StockError::Store(other),
        }
    }
}
