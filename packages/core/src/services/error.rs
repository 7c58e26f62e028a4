//! Service Layer Error Types
//!
//! This module defines the error taxonomy returned by every service
//! operation. Each failure falls into one [`ErrorKind`] so callers can map
//! it to a response (bad request, not found, conflict, server error) without
//! matching on individual variants.

use crate::db::StoreError;
use crate::models::{EntityKind, HierarchyError, QuestionError, StateError, ValidationError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Broad classification of a [`QuestionBankError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input was malformed or broke a business rule
    Validation,
    /// A referenced entity does not exist
    NotFound,
    /// The requested move would corrupt the category tree
    Hierarchy,
    /// The action is not allowed in the entity's current lifecycle state
    State,
    /// Persistence failed; the request itself may be fine
    Infrastructure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Hierarchy => "hierarchy",
            ErrorKind::State => "state",
            ErrorKind::Infrastructure => "infrastructure",
        };
        f.write_str(name)
    }
}

/// Service operation errors
#[derive(Error, Debug)]
pub enum QuestionBankError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: i64 },

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl From<QuestionError> for QuestionBankError {
    fn from(err: QuestionError) -> Self {
        match err {
            QuestionError::State(e) => Self::State(e),
            QuestionError::Validation(e) => Self::Validation(e),
        }
    }
}

impl QuestionBankError {
    pub fn not_found(kind: EntityKind, id: impl Into<i64>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Single-field validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::single(field, message))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Hierarchy(_) => ErrorKind::Hierarchy,
            Self::State(_) => ErrorKind::State,
            Self::Store(_) => ErrorKind::Infrastructure,
        }
    }

    /// True when retrying with freshly loaded data may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(StoreError::VersionConflict { .. }))
    }
}

pub type ServiceResult<T> = Result<T, QuestionBankError>;
