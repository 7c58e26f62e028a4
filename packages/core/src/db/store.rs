//! QuestionBankStore Trait - Storage Abstraction Layer
//!
//! This module defines the `QuestionBankStore` trait that abstracts
//! persistence for the three aggregates (categories, tags, questions). The
//! services only ever talk to this trait, so a SQL, document or in-memory
//! backend can be swapped in without touching business rules.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so network-backed stores fit
//! 2. **Whole-aggregate writes**: Every use case gathers its changes into one
//!    [`ChangeSet`] and hands it to [`commit`](QuestionBankStore::commit),
//!    which must apply it all-or-nothing
//! 3. **Optimistic concurrency**: Each entity carries the `version` it was
//!    loaded with; `commit` rejects the whole set if any stored version moved.
//!    Categories that a write depends on without changing (the new parent
//!    and its ancestors) are registered with
//!    [`expect_category`](ChangeSet::expect_category) and checked the same way
//! 4. **Compiled queries**: Question search arrives as a [`QueryPlan`]; the
//!    store returns the requested page plus the unpaged total

use super::StoreResult;
use crate::models::{
    Category, CategoryId, EntityKind, Predicate, QueryPlan, Question, QuestionId, Tag, TagId,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// A batch of writes to apply atomically
///
/// Saving the same entity twice keeps the last copy.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    categories: BTreeMap<CategoryId, Category>,
    expected_categories: BTreeMap<CategoryId, i64>,
    deleted_categories: BTreeMap<CategoryId, Category>,
    tags: BTreeMap<TagId, Tag>,
    deleted_tags: BTreeMap<TagId, Tag>,
    questions: BTreeMap<QuestionId, Question>,
    deleted_questions: BTreeMap<QuestionId, Question>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_category(&mut self, category: Category) -> &mut Self {
        self.categories.insert(category.id, category);
        self
    }

    pub fn delete_category(&mut self, category: Category) -> &mut Self {
        self.categories.remove(&category.id);
        self.deleted_categories.insert(category.id, category);
        self
    }

    /// Require `category` to still be at its loaded version when committing,
    /// without writing it
    pub fn expect_category(&mut self, category: &Category) -> &mut Self {
        self.expected_categories.insert(category.id, category.version);
        self
    }

    pub fn save_tag(&mut self, tag: Tag) -> &mut Self {
        self.tags.insert(tag.id, tag);
        self
    }

    pub fn save_tags(&mut self, tags: impl IntoIterator<Item = Tag>) -> &mut Self {
        for tag in tags {
            self.save_tag(tag);
        }
        self
    }

    pub fn delete_tag(&mut self, tag: Tag) -> &mut Self {
        self.tags.remove(&tag.id);
        self.deleted_tags.insert(tag.id, tag);
        self
    }

    pub fn save_question(&mut self, question: Question) -> &mut Self {
        self.questions.insert(question.id, question);
        self
    }

    pub fn delete_question(&mut self, question: Question) -> &mut Self {
        self.questions.remove(&question.id);
        self.deleted_questions.insert(question.id, question);
        self
    }

    pub fn saved_categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn deleted_categories(&self) -> impl Iterator<Item = &Category> {
        self.deleted_categories.values()
    }

    /// Read-set versions as `(id, version)` pairs
    pub fn expected_categories(&self) -> impl Iterator<Item = (CategoryId, i64)> + '_ {
        self.expected_categories.iter().map(|(id, version)| (*id, *version))
    }

    pub fn saved_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn deleted_tags(&self) -> impl Iterator<Item = &Tag> {
        self.deleted_tags.values()
    }

    pub fn saved_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.values()
    }

    pub fn deleted_questions(&self) -> impl Iterator<Item = &Question> {
        self.deleted_questions.values()
    }

    /// Number of entity writes in the set; expectations are not writes
    pub fn len(&self) -> usize {
        self.categories.len()
            + self.deleted_categories.len()
            + self.tags.len()
            + self.deleted_tags.len()
            + self.questions.len()
            + self.deleted_questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split into owned parts, for store implementations
    pub fn into_parts(self) -> ChangeSetParts {
        ChangeSetParts {
            categories: self.categories.into_values().collect(),
            expected_categories: self.expected_categories.into_iter().collect(),
            deleted_categories: self.deleted_categories.into_values().collect(),
            tags: self.tags.into_values().collect(),
            deleted_tags: self.deleted_tags.into_values().collect(),
            questions: self.questions.into_values().collect(),
            deleted_questions: self.deleted_questions.into_values().collect(),
        }
    }
}

/// Owned contents of a [`ChangeSet`]
#[derive(Debug, Clone, Default)]
pub struct ChangeSetParts {
    pub categories: Vec<Category>,
    /// `(id, version)` of categories read but not written
    pub expected_categories: Vec<(CategoryId, i64)>,
    pub deleted_categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub deleted_tags: Vec<Tag>,
    pub questions: Vec<Question>,
    pub deleted_questions: Vec<Question>,
}

/// One page of questions plus the total ignoring pagination
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<Question>,
    pub total: usize,
}

/// Persistence operations needed by the question bank services
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; services share them behind `Arc`.
///
/// # Consistency
///
/// `commit` is the only write path and must be atomic. Reads that span
/// several calls (e.g. listing categories and then questions) are not
/// required to see one snapshot.
#[async_trait]
pub trait QuestionBankStore: Send + Sync {
    /// Reserve a fresh identifier for a new entity of `kind`
    async fn allocate_id(&self, kind: EntityKind) -> StoreResult<i64>;

    //
    // CATEGORIES
    //

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;

    /// Fetch several categories; missing ids are skipped
    async fn get_categories(&self, ids: &[CategoryId]) -> StoreResult<Vec<Category>>;

    async fn find_category_by_code(&self, code: &str) -> StoreResult<Option<Category>>;

    /// Every category, in id order
    ///
    /// The tree manager works on the full forest so it can walk ancestors
    /// and cascade into descendants without further round trips.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    //
    // TAGS
    //

    async fn get_tag(&self, id: TagId) -> StoreResult<Option<Tag>>;

    /// Fetch several tags; missing ids are skipped
    async fn get_tags(&self, ids: &[TagId]) -> StoreResult<Vec<Tag>>;

    async fn find_tag_by_slug(&self, slug: &str) -> StoreResult<Option<Tag>>;

    /// Exact (case-sensitive) name lookup
    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>>;

    /// Every tag, in id order
    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;

    //
    // QUESTIONS
    //

    async fn get_question(&self, id: QuestionId) -> StoreResult<Option<Question>>;

    async fn find_questions_by_tag(&self, tag_id: TagId) -> StoreResult<Vec<Question>>;

    async fn find_questions_by_category(
        &self,
        category_id: CategoryId,
    ) -> StoreResult<Vec<Question>>;

    /// Run a compiled plan: filter, order, then page
    async fn query_questions(&self, plan: &QueryPlan) -> StoreResult<QueryPage>;

    /// Every question satisfying all `predicates`, unordered and unpaged
    async fn find_matching_questions(&self, predicates: &[Predicate])
        -> StoreResult<Vec<Question>>;

    //
    // WRITES
    //

    /// Apply every write in `changes` or none of them
    async fn commit(&self, changes: ChangeSet) -> StoreResult<()>;
}
