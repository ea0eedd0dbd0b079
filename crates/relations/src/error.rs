//! Error types for relationship collections
//!
//! Covers precondition violations raised by the collection itself and the
//! repository-level failures that reloads pass through unchanged.

use thiserror::Error;

/// Result type alias for relationship operations
pub type RelationResult<T> = Result<T, RelationError>;

/// Error types for relationship collection operations
///
/// The type is `Clone` because a single reload outcome can be observed by
/// every caller that coalesced onto it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelationError {
    /// Creating a record through a polymorphic association
    #[error("You cannot add '{related_type}' records to the polymorphic relationship '{association}'")]
    PolymorphicCreate {
        association: String,
        related_type: String,
    },

    /// Completion signals that do not match the expected count
    #[error("Load protocol violation: {0}")]
    LoadProtocol(String),

    /// Positional mutation outside the current content
    #[error("Splice out of bounds: index {index} removing {remove} from {len} records")]
    OutOfBounds {
        index: usize,
        remove: usize,
        len: usize,
    },

    /// The owning record was dropped while the collection was still in use
    #[error("Owner of relationship '{0}' has been released")]
    OwnerReleased(String),

    /// Every handle on the collection was dropped before a reload settled
    #[error("Relationship collection '{0}' has been released")]
    Released(String),

    /// A reload was requested while another one is in flight
    #[error("Relationship '{0}' is already reloading")]
    ReloadInProgress(String),

    /// A record of the wrong type was added to a non-polymorphic association
    #[error("Type mismatch: expected '{expected}' but got '{actual}'")]
    TypeMismatch { expected: String, actual: String },

    /// Record not found by the repository
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Remote fetch failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Any other repository failure
    #[error("Repository error: {0}")]
    Repository(String),

    /// A spawned member reload panicked or was aborted
    #[error("Task error: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for RelationError {
    fn from(err: tokio::task::JoinError) -> Self {
        RelationError::Task(err.to_string())
    }
}
