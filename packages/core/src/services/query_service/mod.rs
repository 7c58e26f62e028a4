//! Query Service - Criteria Compilation and Execution
//!
//! This module turns a declarative [`SearchCriteria`] into a [`QueryPlan`]
//! and runs it against the store.
//!
//! # Compilation
//!
//! Each criteria field is handled by its own builder that contributes zero or
//! one [`Predicate`]; the plan is the conjunction of whatever they produce.
//!
//! - Keyword: case-insensitive substring over title or content
//! - Types / categories: membership, skipped when empty
//! - Statuses: membership when given, otherwise "not archived" unless
//!   `include_archived` is set
//! - Difficulty: two independent inclusive bounds
//! - Tags: "any of" or exact "all of" depending on `require_all_tags`
//! - Valid: optional equality on the soft-disable flag
//!
//! Ordering is the declared sort keys (creation time descending when none)
//! followed by ascending id, so repeated queries page identically.
//!
//! # Examples
//!
//! ```rust,no_run
//! use quizbank_core::db::InMemoryStore;
//! use quizbank_core::models::SearchCriteria;
//! use quizbank_core::services::QueryService;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let query_service = QueryService::new(Arc::new(InMemoryStore::new()));
//!
//! let criteria = SearchCriteria::new().with_keyword("Programming").with_limit(10);
//! let page = query_service.execute(&criteria).await?;
//! println!("{} of {} questions", page.len(), page.total());
//! # Ok(())
//! # }
//! ```

use crate::db::QuestionBankStore;
use crate::models::{
    PaginatedResult, Predicate, QueryPlan, Question, QuestionStatus, SearchCriteria,
    DEFAULT_PAGE_LIMIT,
};
use crate::services::error::ServiceResult;
use rand::seq::SliceRandom;
use std::sync::Arc;

pub struct QueryService {
    store: Arc<dyn QuestionBankStore>,
    default_limit: u32,
}

impl QueryService {
    pub fn new(store: Arc<dyn QuestionBankStore>) -> Self {
        Self {
            store,
            default_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Page size used when criteria leave `limit` unset
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    /// Compile criteria into a plan without touching the store
    pub fn compile(&self, criteria: &SearchCriteria) -> QueryPlan {
        let limit = criteria.limit_or(self.default_limit);
        let plan = QueryPlan {
            predicates: build_predicates(criteria),
            ordering: criteria.effective_sort(),
            offset: criteria.offset_or(self.default_limit),
            limit: limit as usize,
        };
        tracing::debug!(
            "Compiled search into {} predicates, offset {}, limit {}",
            plan.predicates.len(),
            plan.offset,
            plan.limit
        );
        plan
    }

    /// Run a search and return one page plus the unpaged total
    pub async fn execute(&self, criteria: &SearchCriteria) -> ServiceResult<PaginatedResult<Question>> {
        let plan = self.compile(criteria);
        let page = self.store.query_questions(&plan).await?;
        Ok(PaginatedResult::new(
            page.items,
            page.total,
            criteria.page(),
            plan.limit as u32,
        ))
    }

    /// Up to `n` distinct questions drawn uniformly from the matching set
    ///
    /// Uses the same filters as [`execute`](Self::execute) but ignores
    /// ordering and paging. Returns every match when fewer than `n` exist.
    pub async fn random_sample(
        &self,
        n: usize,
        criteria: Option<&SearchCriteria>,
    ) -> ServiceResult<Vec<Question>> {
        let predicates = match criteria {
            Some(criteria) => build_predicates(criteria),
            None => build_predicates(&SearchCriteria::default()),
        };
        let matching = self.store.find_matching_questions(&predicates).await?;

        let sample: Vec<Question> = {
            let mut rng = rand::thread_rng();
            matching.choose_multiple(&mut rng, n).cloned().collect()
        };
        tracing::debug!(
            "Sampled {} of {} matching questions",
            sample.len(),
            matching.len()
        );
        Ok(sample)
    }
}

/// Conjunction of every predicate the criteria ask for
pub fn build_predicates(criteria: &SearchCriteria) -> Vec<Predicate> {
    let mut predicates = Vec::new();
    predicates.extend(build_keyword_filter(criteria));
    predicates.extend(build_type_filter(criteria));
    predicates.extend(build_status_filter(criteria));
    predicates.extend(build_difficulty_filters(criteria));
    predicates.extend(build_category_filter(criteria));
    predicates.extend(build_tag_filter(criteria));
    predicates.extend(build_valid_filter(criteria));
    predicates
}

fn build_keyword_filter(criteria: &SearchCriteria) -> Option<Predicate> {
    criteria
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| Predicate::Keyword(k.to_lowercase()))
}

fn build_type_filter(criteria: &SearchCriteria) -> Option<Predicate> {
    (!criteria.types.is_empty()).then(|| Predicate::TypeIn(criteria.types.clone()))
}

fn build_status_filter(criteria: &SearchCriteria) -> Option<Predicate> {
    if !criteria.statuses.is_empty() {
        Some(Predicate::StatusIn(criteria.statuses.clone()))
    } else if !criteria.include_archived {
        Some(Predicate::StatusNot(QuestionStatus::Archived))
    } else {
        None
    }
}

fn build_difficulty_filters(criteria: &SearchCriteria) -> Vec<Predicate> {
    let mut bounds = Vec::new();
    if let Some(min) = criteria.min_difficulty {
        bounds.push(Predicate::DifficultyAtLeast(min));
    }
    if let Some(max) = criteria.max_difficulty {
        bounds.push(Predicate::DifficultyAtMost(max));
    }
    bounds
}

fn build_category_filter(criteria: &SearchCriteria) -> Option<Predicate> {
    (!criteria.category_ids.is_empty())
        .then(|| Predicate::InAnyCategory(criteria.category_ids.clone()))
}

fn build_tag_filter(criteria: &SearchCriteria) -> Option<Predicate> {
    if criteria.tag_ids.is_empty() {
        None
    } else if criteria.require_all_tags {
        Some(Predicate::HasAllTags(criteria.tag_ids.clone()))
    } else {
        Some(Predicate::HasAnyTag(criteria.tag_ids.clone()))
    }
}

fn build_valid_filter(criteria: &SearchCriteria) -> Option<Predicate> {
    criteria.valid.map(Predicate::Valid)
}
