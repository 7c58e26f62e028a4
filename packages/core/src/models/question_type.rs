//! Question types and their static option rules

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    FillBlank,
    Essay,
}

impl QuestionType {
    pub const ALL: [QuestionType; 5] = [
        QuestionType::SingleChoice,
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::FillBlank,
        QuestionType::Essay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::Essay => "essay",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "Single choice",
            QuestionType::MultipleChoice => "Multiple choice",
            QuestionType::TrueFalse => "True/False",
            QuestionType::FillBlank => "Fill in the blank",
            QuestionType::Essay => "Essay",
        }
    }

    /// Whether answers are picked from a list of options
    pub fn requires_options(&self) -> bool {
        matches!(
            self,
            QuestionType::SingleChoice | QuestionType::MultipleChoice | QuestionType::TrueFalse
        )
    }

    pub fn min_options(&self) -> usize {
        match self {
            QuestionType::SingleChoice | QuestionType::MultipleChoice | QuestionType::TrueFalse => 2,
            QuestionType::FillBlank | QuestionType::Essay => 0,
        }
    }

    pub fn max_options(&self) -> usize {
        match self {
            QuestionType::SingleChoice | QuestionType::MultipleChoice => 10,
            QuestionType::TrueFalse => 2,
            QuestionType::FillBlank | QuestionType::Essay => 0,
        }
    }

    pub fn min_correct_options(&self) -> usize {
        match self {
            QuestionType::SingleChoice | QuestionType::TrueFalse => 1,
            QuestionType::MultipleChoice => 2,
            QuestionType::FillBlank | QuestionType::Essay => 0,
        }
    }

    /// Upper bound on correct options, if the type has one
    pub fn max_correct_options(&self) -> Option<usize> {
        match self {
            QuestionType::SingleChoice | QuestionType::TrueFalse => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
