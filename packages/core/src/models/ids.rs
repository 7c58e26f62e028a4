//! Typed Identifiers
//!
//! Every aggregate is addressed by a store-assigned integer. The newtypes keep
//! a `CategoryId` from being passed where a `TagId` is expected while staying
//! a plain integer on the wire (`#[serde(transparent)]`).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw integer value
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identity of a [`Category`](crate::models::Category)
    CategoryId
);
entity_id!(
    /// Identity of a [`Tag`](crate::models::Tag)
    TagId
);
entity_id!(
    /// Identity of a [`Question`](crate::models::Question)
    QuestionId
);
entity_id!(
    /// Identity of an [`AnswerOption`](crate::models::AnswerOption)
    OptionId
);

/// Aggregate kinds, used for id allocation and not-found reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Category,
    Tag,
    Question,
    Option,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Tag => "tag",
            EntityKind::Question => "question",
            EntityKind::Option => "option",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
