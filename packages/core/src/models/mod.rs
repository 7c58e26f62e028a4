//! Data Models
//!
//! This module contains the core domain types of the question bank:
//!
//! - `Category` / `CategoryTree` - Self-referential hierarchy with cached level and path
//! - `Tag` - Folksonomy labels with usage counting
//! - `Question` / `AnswerOption` - The question aggregate and its lifecycle
//! - `Difficulty` - Validated 1–5 scale
//! - `SearchCriteria` / `QueryPlan` / `PaginatedResult` - Search inputs and outputs
//!
//! Models enforce their own invariants and never touch storage.

mod category;
mod difficulty;
mod ids;
mod pagination;
mod question;
mod question_type;
mod search;
mod status;
mod tag;
mod validation;

pub use category::{
    Category, CategoryNode, CategoryTree, HierarchyError, MAX_CATEGORY_CODE_LENGTH,
    MAX_CATEGORY_NAME_LENGTH,
};
pub use difficulty::Difficulty;
pub use ids::{CategoryId, EntityKind, OptionId, QuestionId, TagId};
pub use pagination::PaginatedResult;
pub use question::{
    option_label, validate_options, AnswerOption, Question, QuestionContent, QuestionError,
    MAX_TITLE_LENGTH,
};
pub use question_type::QuestionType;
pub use search::{
    matches_all, Predicate, QueryPlan, SearchCriteria, SortDirection, SortField, SortKey,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use status::{QuestionStatus, StateError, StatusAction, TRANSITIONS};
pub use tag::{slugify, Tag, MAX_TAG_NAME_LENGTH};
pub use validation::{FieldError, ValidationError};
