//! Storage Error Types
//!
//! Failures at the persistence boundary. These are infrastructure errors,
//! kept separate from the domain taxonomy so callers can tell "your request
//! was wrong" apart from "the store could not do it".

use crate::models::EntityKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency check failed; someone committed in between
    #[error("Version conflict for {kind} {id}: expected version {expected}, found {actual}")]
    VersionConflict {
        kind: EntityKind,
        id: i64,
        expected: i64,
        actual: i64,
    },

    /// A uniqueness or integrity rule enforced by the store was violated
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A record the change set expected to exist is gone
    #[error("Missing {kind} record {id}")]
    MissingRecord { kind: EntityKind, id: i64 },

    /// The backing store could not be reached or failed internally
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn version_conflict(kind: EntityKind, id: i64, expected: i64, actual: i64) -> Self {
        Self::VersionConflict {
            kind,
            id,
            expected,
            actual,
        }
    }

    pub fn constraint_violation(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn missing_record(kind: EntityKind, id: i64) -> Self {
        Self::MissingRecord { kind, id }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
