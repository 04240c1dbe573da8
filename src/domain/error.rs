//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent caller mistakes the engine cannot absorb.
///
/// Structural anomalies in the hierarchy (dangling `reports_to`, cycles)
/// are never reported here: traversal and layout degrade gracefully instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown node '{id}' in board '{board}'")]
    UnknownNode { board: String, id: String },

    #[error("unknown board: {0}")]
    UnknownBoard(String),

    #[error("invalid entity: {message}")]
    InvalidEntity { message: String },
}
