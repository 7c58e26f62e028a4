//! Search criteria and compiled query plans
//!
//! [`SearchCriteria`] is what callers send: a declarative, storage-agnostic
//! filter + sort + page request. The query service compiles it into a
//! [`QueryPlan`], a flat conjunction of [`Predicate`]s plus ordering and
//! paging, which a store can either evaluate directly (see
//! [`QueryPlan::matches`]) or translate into its own query language.

use super::{CategoryId, Difficulty, Question, QuestionStatus, QuestionType, TagId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Sortable question fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Title,
    Type,
    Status,
    Difficulty,
    Score,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Compare two questions on this key
    pub fn compare(&self, a: &Question, b: &Question) -> Ordering {
        let ordering = match self.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title().cmp(b.title()),
            SortField::Type => a.question_type().cmp(&b.question_type()),
            SortField::Status => a.status().cmp(&b.status()),
            SortField::Difficulty => a.difficulty().cmp(&b.difficulty()),
            SortField::Score => a.score().total_cmp(&b.score()),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Declarative question search request
///
/// Empty sets mean "no restriction". `page` and `limit` are clamped on read:
/// page to at least 1, limit to `1..=100`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCriteria {
    /// Case-insensitive substring over title or content
    pub keyword: Option<String>,
    pub types: BTreeSet<QuestionType>,
    /// When empty, every status except archived (unless `include_archived`)
    pub statuses: BTreeSet<QuestionStatus>,
    pub min_difficulty: Option<Difficulty>,
    pub max_difficulty: Option<Difficulty>,
    /// Question must belong to at least one of these
    pub category_ids: BTreeSet<CategoryId>,
    pub tag_ids: BTreeSet<TagId>,
    /// `true`: question must carry every tag in `tag_ids`; `false`: any of them
    pub require_all_tags: bool,
    pub include_archived: bool,
    /// Restrict to valid (`Some(true)`) or soft-disabled (`Some(false)`) questions
    pub valid: Option<bool>,
    /// Applied in order; empty means newest first
    pub sort: Vec<SortKey>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = QuestionType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = QuestionStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_difficulty_range(
        mut self,
        min: Option<Difficulty>,
        max: Option<Difficulty>,
    ) -> Self {
        self.min_difficulty = min;
        self.max_difficulty = max;
        self
    }

    pub fn with_categories(mut self, ids: impl IntoIterator<Item = CategoryId>) -> Self {
        self.category_ids = ids.into_iter().collect();
        self
    }

    pub fn with_tags(mut self, ids: impl IntoIterator<Item = TagId>, require_all: bool) -> Self {
        self.tag_ids = ids.into_iter().collect();
        self.require_all_tags = require_all;
        self
    }

    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = Some(valid);
        self
    }

    pub fn sort_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort.push(SortKey::new(field, direction));
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 1-based page, never below 1
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=100`, with the built-in default
    pub fn limit(&self) -> u32 {
        self.limit_or(DEFAULT_PAGE_LIMIT)
    }

    /// Page size, falling back to `default` when none was requested
    pub fn limit_or(&self, default: u32) -> u32 {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_LIMIT)
    }

    /// Rows skipped before the requested page, sized like [`limit_or`](Self::limit_or)
    pub fn offset_or(&self, default_limit: u32) -> usize {
        (self.page() as usize - 1) * self.limit_or(default_limit) as usize
    }

    /// Declared sort keys, or creation time descending when none were given
    pub fn effective_sort(&self) -> Vec<SortKey> {
        if self.sort.is_empty() {
            vec![SortKey::new(SortField::CreatedAt, SortDirection::Desc)]
        } else {
            self.sort.clone()
        }
    }
}

/// One filter condition of a compiled plan
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Lower-cased needle matched against title or content
    Keyword(String),
    TypeIn(BTreeSet<QuestionType>),
    StatusIn(BTreeSet<QuestionStatus>),
    StatusNot(QuestionStatus),
    DifficultyAtLeast(Difficulty),
    DifficultyAtMost(Difficulty),
    InAnyCategory(BTreeSet<CategoryId>),
    HasAnyTag(BTreeSet<TagId>),
    /// Count of matching tags must equal the size of the set
    HasAllTags(BTreeSet<TagId>),
    Valid(bool),
}

impl Predicate {
    pub fn matches(&self, question: &Question) -> bool {
        match self {
            Predicate::Keyword(needle) => {
                question.title().to_lowercase().contains(needle.as_str())
                    || question.content().to_lowercase().contains(needle.as_str())
            }
            Predicate::TypeIn(types) => types.contains(&question.question_type()),
            Predicate::StatusIn(statuses) => statuses.contains(&question.status()),
            Predicate::StatusNot(status) => question.status() != *status,
            Predicate::DifficultyAtLeast(min) => question.difficulty() >= *min,
            Predicate::DifficultyAtMost(max) => question.difficulty() <= *max,
            Predicate::InAnyCategory(ids) => ids.iter().any(|id| question.in_category(*id)),
            Predicate::HasAnyTag(ids) => ids.iter().any(|id| question.has_tag(*id)),
            Predicate::HasAllTags(ids) => {
                ids.iter().filter(|id| question.has_tag(**id)).count() == ids.len()
            }
            Predicate::Valid(valid) => question.is_valid() == *valid,
        }
    }
}

/// Predicates + ordering + paging, ready for a store to execute
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub predicates: Vec<Predicate>,
    /// Applied in order, followed by ascending id as the final tie-break
    pub ordering: Vec<SortKey>,
    pub offset: usize,
    pub limit: usize,
}

impl QueryPlan {
    /// True when every predicate holds
    pub fn matches(&self, question: &Question) -> bool {
        matches_all(&self.predicates, question)
    }

    /// Total order over questions: declared keys, then id
    pub fn compare(&self, a: &Question, b: &Question) -> Ordering {
        self.ordering
            .iter()
            .map(|key| key.compare(a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }
}

/// Conjunction of `predicates`
pub fn matches_all(predicates: &[Predicate], question: &Question) -> bool {
    predicates.iter().all(|p| p.matches(question))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_and_limit_clamping() {
        let criteria = SearchCriteria::new().with_page(0).with_limit(500);
        assert_eq!(criteria.page(), 1);
        assert_eq!(criteria.limit(), 100);

        let criteria = SearchCriteria::new().with_limit(0);
        assert_eq!(criteria.limit(), 1);

        let criteria = SearchCriteria::new();
        assert_eq!(criteria.page(), 1);
        assert_eq!(criteria.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(criteria.offset_or(DEFAULT_PAGE_LIMIT), 0);

        let criteria = SearchCriteria::new().with_page(3).with_limit(20);
        assert_eq!(criteria.offset_or(DEFAULT_PAGE_LIMIT), 40);
        assert_eq!(criteria.offset_or(5), 40);

        // Without an explicit limit the caller's default sizes the pages
        let criteria = SearchCriteria::new().with_page(3);
        assert_eq!(criteria.offset_or(5), 10);
        assert_eq!(criteria.offset_or(0), 2);
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let criteria = SearchCriteria::new();
        assert_eq!(
            criteria.effective_sort(),
            vec![SortKey::new(SortField::CreatedAt, SortDirection::Desc)]
        );

        let criteria = SearchCriteria::new().sort_by(SortField::Title, SortDirection::Asc);
        assert_eq!(criteria.effective_sort()[0].field, SortField::Title);
    }

    #[test]
    fn test_criteria_deserialize_from_camel_case() {
        let criteria: SearchCriteria = serde_json::from_value(serde_json::json!({
            "keyword": "rust",
            "types": ["single_choice"],
            "minDifficulty": 2,
            "tagIds": [1, 2],
            "requireAllTags": true,
            "sort": [{"field": "score", "direction": "desc"}],
            "page": 2
        }))
        .unwrap();

        assert_eq!(criteria.keyword.as_deref(), Some("rust"));
        assert!(criteria.types.contains(&QuestionType::SingleChoice));
        assert_eq!(criteria.min_difficulty, Some(Difficulty::EASY));
        assert!(criteria.require_all_tags);
        assert_eq!(criteria.tag_ids.len(), 2);
        assert_eq!(criteria.sort[0].field, SortField::Score);
        assert_eq!(criteria.page(), 2);
        assert!(!criteria.include_archived);
    }

    #[test]
    fn test_invalid_difficulty_in_criteria_rejected() {
        let parsed = serde_json::from_value::<SearchCriteria>(serde_json::json!({
            "maxDifficulty": 7
        }));
        assert!(parsed.is_err());
    }
}
