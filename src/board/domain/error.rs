//! Error types for board domain validation and local state access.

use thiserror::Error;

/// Errors returned while constructing domain board values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoardDomainError {
    /// The task identifier is empty or only whitespace.
    #[error("task identifier must not be empty")]
    EmptyTaskId,

    /// The lane name is not one of the fixed board lanes.
    #[error("unknown lane: {0}")]
    UnknownLane(String),
}

/// Errors returned while accessing the shared local board state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocalStateError {
    /// The pending move ledger lock was poisoned by a panicking holder.
    #[error("pending move ledger unavailable: {0}")]
    LedgerPoisoned(String),
}
