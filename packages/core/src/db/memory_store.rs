//! In-memory QuestionBankStore
//!
//! Keeps all aggregates in ordered maps behind a single tokio `RwLock`.
//! `commit` validates the whole change set under the write lock before
//! applying anything, which makes it atomic and serializable with respect to
//! other commits. Validation covers written and expected versions, unique
//! codes and slugs, and parent links between categories.

use super::store::{ChangeSet, ChangeSetParts, QueryPage, QuestionBankStore};
use super::{StoreError, StoreResult};
use crate::models::{
    matches_all, Category, CategoryId, EntityKind, Predicate, QueryPlan, Question, QuestionId,
    Tag, TagId,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StoreState {
    categories: BTreeMap<CategoryId, Category>,
    tags: BTreeMap<TagId, Tag>,
    questions: BTreeMap<QuestionId, Question>,
}

#[derive(Debug, Default)]
struct Sequences {
    category: AtomicI64,
    tag: AtomicI64,
    question: AtomicI64,
    option: AtomicI64,
}

impl Sequences {
    fn next(&self, kind: EntityKind) -> i64 {
        let counter = match kind {
            EntityKind::Category => &self.category,
            EntityKind::Tag => &self.tag,
            EntityKind::Question => &self.question,
            EntityKind::Option => &self.option,
        };
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    sequences: Sequences,
}

/// Check the optimistic version of one write
fn check_version(
    kind: EntityKind,
    id: i64,
    stored: Option<i64>,
    expected: i64,
    must_exist: bool,
) -> StoreResult<()> {
    match stored {
        Some(actual) if actual != expected => {
            Err(StoreError::version_conflict(kind, id, expected, actual))
        }
        Some(_) => Ok(()),
        // A write based on a loaded copy (version > 0) or a delete needs the row
        None if must_exist || expected > 0 => Err(StoreError::missing_record(kind, id)),
        None => Ok(()),
    }
}

/// Ensure `key(entity)` stays unique across the post-commit state
fn check_unique<'a, K, V: 'a>(
    what: &str,
    existing: impl Iterator<Item = (K, &'a V)>,
    written: impl Iterator<Item = (K, &'a V)>,
    removed: &HashSet<K>,
    key: impl Fn(&V) -> &str,
) -> StoreResult<()>
where
    K: std::hash::Hash + Eq + Copy + std::fmt::Display,
{
    let written: Vec<(K, &V)> = written.collect();
    let rewritten: HashSet<K> = written.iter().map(|(id, _)| *id).collect();

    let mut owners: HashMap<String, K> = HashMap::new();
    for (id, entity) in existing {
        if !removed.contains(&id) && !rewritten.contains(&id) {
            owners.insert(key(entity).to_string(), id);
        }
    }
    for (id, entity) in written {
        if let Some(owner) = owners.insert(key(entity).to_string(), id) {
            return Err(StoreError::constraint_violation(format!(
                "{} '{}' of {} already used by {}",
                what,
                key(entity),
                id,
                owner
            )));
        }
    }
    Ok(())
}

/// Every written category's parent must survive the commit, and no surviving
/// category may keep a deleted parent
fn check_parents(state: &StoreState, parts: &ChangeSetParts) -> StoreResult<()> {
    let removed: HashSet<CategoryId> = parts.deleted_categories.iter().map(|c| c.id).collect();
    let written: HashMap<CategoryId, &Category> =
        parts.categories.iter().map(|c| (c.id, c)).collect();
    let survives = |id: &CategoryId| {
        !removed.contains(id) && (written.contains_key(id) || state.categories.contains_key(id))
    };

    for category in &parts.categories {
        if let Some(parent_id) = category.parent_id() {
            if !survives(&parent_id) {
                return Err(StoreError::constraint_violation(format!(
                    "category {} references missing parent {}",
                    category.id, parent_id
                )));
            }
        }
    }

    if removed.is_empty() {
        return Ok(());
    }
    let untouched = state
        .categories
        .values()
        .filter(|c| !written.contains_key(&c.id) && !removed.contains(&c.id));
    for category in untouched.chain(parts.categories.iter()) {
        if let Some(parent_id) = category.parent_id().filter(|p| removed.contains(p)) {
            return Err(StoreError::constraint_violation(format!(
                "category {} still has child {}",
                parent_id, category.id
            )));
        }
    }
    Ok(())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored questions
    pub async fn question_count(&self) -> usize {
        self.state.read().await.questions.len()
    }

    fn validate(state: &StoreState, parts: &ChangeSetParts) -> StoreResult<()> {
        for c in &parts.categories {
            let stored = state.categories.get(&c.id).map(|s| s.version);
            check_version(EntityKind::Category, c.id.0, stored, c.version, false)?;
        }
        for c in &parts.deleted_categories {
            let stored = state.categories.get(&c.id).map(|s| s.version);
            check_version(EntityKind::Category, c.id.0, stored, c.version, true)?;
        }
        for (id, version) in &parts.expected_categories {
            let stored = state.categories.get(id).map(|s| s.version);
            check_version(EntityKind::Category, id.0, stored, *version, true)?;
        }
        for t in &parts.tags {
            let stored = state.tags.get(&t.id).map(|s| s.version);
            check_version(EntityKind::Tag, t.id.0, stored, t.version, false)?;
        }
        for t in &parts.deleted_tags {
            let stored = state.tags.get(&t.id).map(|s| s.version);
            check_version(EntityKind::Tag, t.id.0, stored, t.version, true)?;
        }
        for q in &parts.questions {
            let stored = state.questions.get(&q.id).map(|s| s.version);
            check_version(EntityKind::Question, q.id.0, stored, q.version, false)?;
        }
        for q in &parts.deleted_questions {
            let stored = state.questions.get(&q.id).map(|s| s.version);
            check_version(EntityKind::Question, q.id.0, stored, q.version, true)?;
        }

        let removed_categories: HashSet<CategoryId> =
            parts.deleted_categories.iter().map(|c| c.id).collect();
        check_unique(
            "category code",
            state.categories.iter().map(|(id, c)| (*id, c)),
            parts.categories.iter().map(|c| (c.id, c)),
            &removed_categories,
            Category::code,
        )?;

        let removed_tags: HashSet<TagId> = parts.deleted_tags.iter().map(|t| t.id).collect();
        check_unique(
            "tag slug",
            state.tags.iter().map(|(id, t)| (*id, t)),
            parts.tags.iter().map(|t| (t.id, t)),
            &removed_tags,
            Tag::slug,
        )?;

        check_parents(state, parts)
    }
}

#[async_trait]
impl QuestionBankStore for InMemoryStore {
    async fn allocate_id(&self, kind: EntityKind) -> StoreResult<i64> {
        Ok(self.sequences.next(kind))
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn get_categories(&self, ids: &[CategoryId]) -> StoreResult<Vec<Category>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.categories.get(id).cloned())
            .collect())
    }

    async fn find_category_by_code(&self, code: &str) -> StoreResult<Option<Category>> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .find(|c| c.code() == code)
            .cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self
            .state
            .read()
            .await
            .categories
            .values()
            .cloned()
            .collect())
    }

    async fn get_tag(&self, id: TagId) -> StoreResult<Option<Tag>> {
        Ok(self.state.read().await.tags.get(&id).cloned())
    }

    async fn get_tags(&self, ids: &[TagId]) -> StoreResult<Vec<Tag>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.tags.get(id).cloned())
            .collect())
    }

    async fn find_tag_by_slug(&self, slug: &str) -> StoreResult<Option<Tag>> {
        let state = self.state.read().await;
        Ok(state.tags.values().find(|t| t.slug() == slug).cloned())
    }

    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let state = self.state.read().await;
        Ok(state.tags.values().find(|t| t.name() == name).cloned())
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(self.state.read().await.tags.values().cloned().collect())
    }

    async fn get_question(&self, id: QuestionId) -> StoreResult<Option<Question>> {
        Ok(self.state.read().await.questions.get(&id).cloned())
    }

    async fn find_questions_by_tag(&self, tag_id: TagId) -> StoreResult<Vec<Question>> {
        let state = self.state.read().await;
        Ok(state
            .questions
            .values()
            .filter(|q| q.has_tag(tag_id))
            .cloned()
            .collect())
    }

    async fn find_questions_by_category(
        &self,
        category_id: CategoryId,
    ) -> StoreResult<Vec<Question>> {
        let state = self.state.read().await;
        Ok(state
            .questions
            .values()
            .filter(|q| q.in_category(category_id))
            .cloned()
            .collect())
    }

    async fn query_questions(&self, plan: &QueryPlan) -> StoreResult<QueryPage> {
        let state = self.state.read().await;
        let mut matching: Vec<&Question> =
            state.questions.values().filter(|q| plan.matches(q)).collect();
        let total = matching.len();

        matching.sort_by(|a, b| plan.compare(a, b));
        let items = matching
            .into_iter()
            .skip(plan.offset)
            .take(plan.limit)
            .cloned()
            .collect();

        Ok(QueryPage { items, total })
    }

    async fn find_matching_questions(
        &self,
        predicates: &[Predicate],
    ) -> StoreResult<Vec<Question>> {
        let state = self.state.read().await;
        Ok(state
            .questions
            .values()
            .filter(|q| matches_all(predicates, q))
            .cloned()
            .collect())
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let writes = changes.len();
        let parts = changes.into_parts();

        let mut state = self.state.write().await;
        Self::validate(&state, &parts)?;

        for category in &parts.deleted_categories {
            state.categories.remove(&category.id);
        }
        for tag in &parts.deleted_tags {
            state.tags.remove(&tag.id);
        }
        for question in &parts.deleted_questions {
            state.questions.remove(&question.id);
        }
        for mut category in parts.categories {
            category.version += 1;
            state.categories.insert(category.id, category);
        }
        for mut tag in parts.tags {
            tag.version += 1;
            state.tags.insert(tag.id, tag);
        }
        for mut question in parts.questions {
            question.version += 1;
            state.questions.insert(question.id, question);
        }

        tracing::debug!("Committed change set with {} writes", writes);
        Ok(())
    }
}
