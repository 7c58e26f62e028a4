//! Question lifecycle state machine
//!
//! The whole legal transition set lives in [`TRANSITIONS`]; every status
//! change (and the edit guard) is a lookup in that table.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Draft,
    Published,
    Archived,
}

/// Things a caller can attempt against a question's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusAction {
    Publish,
    Archive,
    /// Content change; legal only as a Draft self-loop
    Edit,
}

/// `(from, action) → to`
pub const TRANSITIONS: &[(QuestionStatus, StatusAction, QuestionStatus)] = &[
    (QuestionStatus::Draft, StatusAction::Publish, QuestionStatus::Published),
    (QuestionStatus::Published, StatusAction::Archive, QuestionStatus::Archived),
    (QuestionStatus::Draft, StatusAction::Edit, QuestionStatus::Draft),
];

/// An action that is not legal from the current status
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StateError {
    pub from: QuestionStatus,
    pub action: StatusAction,
    pub message: String,
}

impl StatusAction {
    fn rejection(&self) -> &'static str {
        match self {
            StatusAction::Publish => "Only draft questions can be published",
            StatusAction::Archive => "Only published questions can be archived",
            StatusAction::Edit => "Only draft questions can be edited",
        }
    }
}

impl QuestionStatus {
    pub const ALL: [QuestionStatus; 3] = [
        QuestionStatus::Draft,
        QuestionStatus::Published,
        QuestionStatus::Archived,
    ];

    /// Look up the status reached by `action`
    pub fn apply(self, action: StatusAction) -> Result<QuestionStatus, StateError> {
        TRANSITIONS
            .iter()
            .find(|(from, a, _)| *from == self && *a == action)
            .map(|(_, _, to)| *to)
            .ok_or_else(|| StateError {
                from: self,
                action,
                message: action.rejection().to_string(),
            })
    }

    pub fn can(self, action: StatusAction) -> bool {
        self.apply(action).is_ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Draft => "draft",
            QuestionStatus::Published => "published",
            QuestionStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
