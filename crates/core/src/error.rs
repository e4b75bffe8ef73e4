//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only. Storage concerns are mapped into
/// this enum by the infra layer (`Conflict` for lost optimistic races).
///
/// Drift between ledger sums and canonical totals is deliberately absent:
/// it is an observation carried by audit reports, never a failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A department code was malformed (empty, empty token, too many tokens).
    #[error("invalid department code: {0}")]
    InvalidCode(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A department, item or transfer does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A transfer request violates its shape rules.
    #[error("invalid transfer: {0}")]
    InvalidTransfer(String),

    /// Applying the change would drive a ledger row below zero.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// A transition was attempted from a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A category or setting could not be resolved.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A concurrent writer won the race (stale version).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid_code(msg: impl Into<String>) -> Self {
        Self::InvalidCode(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_transfer(msg: impl Into<String>) -> Self {
        Self::InvalidTransfer(msg.into())
    }

    pub fn insufficient_stock(available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            available,
            requested,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Whether the caller may retry the same operation later and expect a
    /// different outcome (stock may be replenished, a racing writer may finish).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::InsufficientStock { .. } | DomainError::Conflict(_)
        )
    }
}
