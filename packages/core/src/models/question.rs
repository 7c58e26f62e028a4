//! Question aggregate
//!
//! A [`Question`] owns its ordered [`AnswerOption`] list and references
//! categories and tags by id. All mutations go through methods on the
//! aggregate root so that:
//!
//! - content and options can only change while the question is a draft,
//! - the option list always satisfies the rules of the question type,
//! - tag membership and [`Tag::usage_count`] move together.

use super::status::{QuestionStatus, StateError, StatusAction};
use super::validation::check_text;
use super::{CategoryId, Difficulty, OptionId, QuestionId, QuestionType, Tag, TagId};
use super::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

pub const MAX_TITLE_LENGTH: usize = 255;

/// Failures of aggregate-level mutations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuestionError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Letter label for the option at `position` in presentation order
///
/// `0 → "A"`, `25 → "Z"`, `26 → "AA"`.
pub fn option_label(position: usize) -> String {
    let mut n = position + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// One answer choice, owned by its question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub id: OptionId,
    pub question_id: QuestionId,
    pub content: String,
    pub is_correct: bool,
    pub sort_order: i32,
    pub explanation: Option<String>,
}

/// Editable scalar fields of a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionContent {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub score: f64,
    pub explanation: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub valid: bool,
}

impl QuestionContent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        check_text(&mut errors, "title", &self.title, Some(MAX_TITLE_LENGTH));
        check_text(&mut errors, "content", &self.content, None);
        if !self.score.is_finite() || self.score <= 0.0 {
            errors.push("score", format!("must be greater than 0 (got {})", self.score));
        }
        errors.into_result()
    }
}

/// Check an option list against the rules of `question_type`
pub fn validate_options(
    question_type: QuestionType,
    options: &[AnswerOption],
) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();

    if !question_type.requires_options() {
        if !options.is_empty() {
            errors.push(
                "options",
                format!("{} questions do not take options", question_type.label()),
            );
        }
        return errors.into_result();
    }

    let count = options.len();
    let (min, max) = (question_type.min_options(), question_type.max_options());
    if count < min {
        errors.push(
            "options",
            format!("at least {} options are required (got {})", min, count),
        );
    } else if count > max {
        errors.push(
            "options",
            format!("at most {} options are allowed (got {})", max, count),
        );
    }

    let correct = options.iter().filter(|o| o.is_correct).count();
    let min_correct = question_type.min_correct_options().max(1);
    if correct < min_correct {
        errors.push(
            "options",
            format!(
                "at least {} correct option(s) required (got {})",
                min_correct, correct
            ),
        );
    }
    if let Some(max_correct) = question_type.max_correct_options() {
        if correct > max_correct {
            errors.push(
                "options",
                format!(
                    "{} questions allow exactly {} correct option (got {})",
                    question_type.label(),
                    max_correct,
                    correct
                ),
            );
        }
    }

    for (index, option) in options.iter().enumerate() {
        check_text(&mut errors, &format!("options[{}].content", index), &option.content, None);
    }

    errors.into_result()
}

/// The question aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    #[serde(flatten)]
    body: QuestionContent,
    status: QuestionStatus,
    category_ids: BTreeSet<CategoryId>,
    tag_ids: BTreeSet<TagId>,
    options: Vec<AnswerOption>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl Question {
    /// Create a draft question with its options
    pub fn new(
        id: QuestionId,
        body: QuestionContent,
        options: Vec<AnswerOption>,
    ) -> Result<Self, ValidationError> {
        let options = Self::prepare_options(id, body.question_type, options)?;
        body.validate()?;

        let now = Utc::now();
        Ok(Self {
            id,
            body,
            status: QuestionStatus::Draft,
            category_ids: BTreeSet::new(),
            tag_ids: BTreeSet::new(),
            options,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn title(&self) -> &str {
        &self.body.title
    }

    pub fn content(&self) -> &str {
        &self.body.content
    }

    pub fn body(&self) -> &QuestionContent {
        &self.body
    }

    pub fn question_type(&self) -> QuestionType {
        self.body.question_type
    }

    pub fn difficulty(&self) -> Difficulty {
        self.body.difficulty
    }

    pub fn score(&self) -> f64 {
        self.body.score
    }

    pub fn explanation(&self) -> Option<&str> {
        self.body.explanation.as_deref()
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.body.metadata.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.body.valid
    }

    pub fn status(&self) -> QuestionStatus {
        self.status
    }

    pub fn category_ids(&self) -> &BTreeSet<CategoryId> {
        &self.category_ids
    }

    pub fn tag_ids(&self) -> &BTreeSet<TagId> {
        &self.tag_ids
    }

    /// Options in presentation order
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    /// Options paired with their letter labels
    pub fn labeled_options(&self) -> Vec<(String, &AnswerOption)> {
        self.options
            .iter()
            .enumerate()
            .map(|(i, o)| (option_label(i), o))
            .collect()
    }

    pub fn correct_options(&self) -> impl Iterator<Item = &AnswerOption> {
        self.options.iter().filter(|o| o.is_correct)
    }

    pub fn is_editable(&self) -> bool {
        self.status.can(StatusAction::Edit)
    }

    pub fn is_usable(&self) -> bool {
        self.status == QuestionStatus::Published
    }

    pub fn has_tag(&self, tag_id: TagId) -> bool {
        self.tag_ids.contains(&tag_id)
    }

    pub fn in_category(&self, category_id: CategoryId) -> bool {
        self.category_ids.contains(&category_id)
    }

    /// Fail with a state error unless the question is still a draft
    pub fn ensure_editable(&self) -> Result<(), StateError> {
        self.status.apply(StatusAction::Edit).map(|_| ())
    }

    /// Replace content and options together
    ///
    /// The state guard runs before anything is validated or changed; on any
    /// failure the question is left untouched.
    pub fn revise(
        &mut self,
        body: QuestionContent,
        options: Vec<AnswerOption>,
    ) -> Result<(), QuestionError> {
        self.ensure_editable()?;
        body.validate()?;
        let options = Self::prepare_options(self.id, body.question_type, options)?;

        self.body = body;
        self.options = options;
        self.touch();
        Ok(())
    }

    /// Replace the category set
    pub fn replace_categories(
        &mut self,
        category_ids: impl IntoIterator<Item = CategoryId>,
    ) -> Result<(), StateError> {
        self.ensure_editable()?;
        self.category_ids = category_ids.into_iter().collect();
        self.touch();
        Ok(())
    }

    /// Drop a category reference, whatever the status (used when the category is deleted)
    pub fn remove_category(&mut self, category_id: CategoryId) -> bool {
        let removed = self.category_ids.remove(&category_id);
        if removed {
            self.touch();
        }
        removed
    }

    /// Add `tag` to this question, counting the new usage
    ///
    /// Returns `false` (and leaves the count alone) if the tag was already attached.
    pub fn attach_tag(&mut self, tag: &mut Tag) -> bool {
        let added = self.tag_ids.insert(tag.id);
        if added {
            tag.increment_usage();
            self.touch();
        }
        added
    }

    /// Remove `tag` from this question, releasing its usage
    pub fn detach_tag(&mut self, tag: &mut Tag) -> bool {
        let removed = self.tag_ids.remove(&tag.id);
        if removed {
            tag.decrement_usage();
            self.touch();
        }
        removed
    }

    /// Check the option invariant for the current type
    pub fn validate_options(&self) -> Result<(), ValidationError> {
        validate_options(self.body.question_type, &self.options)
    }

    /// Draft → Published, re-checking the option invariant
    pub fn publish(&mut self) -> Result<(), QuestionError> {
        let next = self.status.apply(StatusAction::Publish)?;
        self.validate_options()?;
        self.status = next;
        self.touch();
        Ok(())
    }

    /// Published → Archived
    pub fn archive(&mut self) -> Result<(), StateError> {
        self.status = self.status.apply(StatusAction::Archive)?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn prepare_options(
        question_id: QuestionId,
        question_type: QuestionType,
        mut options: Vec<AnswerOption>,
    ) -> Result<Vec<AnswerOption>, ValidationError> {
        validate_options(question_type, &options)?;
        for option in &mut options {
            option.question_id = question_id;
        }
        options.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.id.cmp(&b.id)));
        Ok(options)
    }
}
