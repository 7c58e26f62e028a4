//! Difficulty value object
//!
//! A validated 1–5 scale. Serialized as the bare integer; deserializing an
//! out-of-range value fails rather than producing an invalid `Difficulty`.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub const VERY_EASY: Difficulty = Difficulty(1);
    pub const EASY: Difficulty = Difficulty(2);
    pub const MEDIUM: Difficulty = Difficulty(3);
    pub const HARD: Difficulty = Difficulty(4);
    pub const VERY_HARD: Difficulty = Difficulty(5);

    /// Create a difficulty, rejecting values outside `1..=5`
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::single(
                "difficulty",
                format!(
                    "must be between {} and {} (got {})",
                    Self::MIN,
                    Self::MAX,
                    value
                ),
            ))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Very Easy",
            2 => "Easy",
            3 => "Medium",
            4 => "Hard",
            _ => "Very Hard",
        }
    }

    pub fn is_easier_than(self, other: Difficulty) -> bool {
        self < other
    }

    pub fn is_harder_than(self, other: Difficulty) -> bool {
        self > other
    }

    /// All five levels, easiest first
    pub fn all() -> [Difficulty; 5] {
        [
            Self::VERY_EASY,
            Self::EASY,
            Self::MEDIUM,
            Self::HARD,
            Self::VERY_HARD,
        ]
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Difficulty::new(value)
    }
}

impl From<Difficulty> for u8 {
    fn from(value: Difficulty) -> Self {
        value.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.0)
    }
}
