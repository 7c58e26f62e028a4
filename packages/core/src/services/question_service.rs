//! Question Service - Question Lifecycle Use Cases
//!
//! Creates, revises, publishes, archives and deletes questions, keeping tag
//! usage counts in step with tag membership. Search and random sampling are
//! delegated to [`QueryService`].
//!
//! Create and update fully replace the category set, the tag set and the
//! option list. Old tags are detached before new ones are attached, and
//! replacement options always get fresh ids.

use crate::db::{ChangeSet, DomainEvent, QuestionBankStore};
use crate::models::{
    AnswerOption, CategoryId, Difficulty, EntityKind, OptionId, PaginatedResult, Question,
    QuestionContent, QuestionId, QuestionType, SearchCriteria, Tag, TagId,
};
use crate::services::error::{QuestionBankError, ServiceResult};
use crate::services::query_service::QueryService;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::broadcast;

/// One answer option as supplied by a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionParams {
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
    /// Defaults to the option's position in the input list
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl OptionParams {
    pub fn new(content: impl Into<String>, is_correct: bool) -> Self {
        Self {
            content: content.into(),
            is_correct,
            ..Default::default()
        }
    }
}

fn default_difficulty() -> u8 {
    Difficulty::MEDIUM.value()
}

fn default_score() -> f64 {
    1.0
}

fn default_valid() -> bool {
    true
}

/// Full question payload for create and update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionParams {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Raw 1-5 value; validated into a [`Difficulty`]
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default = "default_score")]
    pub score: f64,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default)]
    pub options: Vec<OptionParams>,
}

impl QuestionParams {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        question_type: QuestionType,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            question_type,
            difficulty: default_difficulty(),
            score: default_score(),
            explanation: None,
            metadata: None,
            valid: true,
            category_ids: Vec::new(),
            tag_ids: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_options(mut self, options: Vec<OptionParams>) -> Self {
        self.options = options;
        self
    }

    pub fn with_categories(mut self, ids: impl IntoIterator<Item = CategoryId>) -> Self {
        self.category_ids = ids.into_iter().collect();
        self
    }

    pub fn with_tags(mut self, ids: impl IntoIterator<Item = TagId>) -> Self {
        self.tag_ids = ids.into_iter().collect();
        self
    }

    fn to_content(&self) -> ServiceResult<QuestionContent> {
        let content = QuestionContent {
            title: self.title.clone(),
            content: self.content.clone(),
            question_type: self.question_type,
            difficulty: Difficulty::new(self.difficulty)?,
            score: self.score,
            explanation: self.explanation.clone().filter(|e| !e.trim().is_empty()),
            metadata: self.metadata.clone(),
            valid: self.valid,
        };
        content.validate()?;
        Ok(content)
    }
}

pub struct QuestionService {
    store: Arc<dyn QuestionBankStore>,
    event_tx: broadcast::Sender<DomainEvent>,
    query: QueryService,
}

impl QuestionService {
    pub fn new(
        store: Arc<dyn QuestionBankStore>,
        event_tx: broadcast::Sender<DomainEvent>,
        query: QueryService,
    ) -> Self {
        Self {
            store,
            event_tx,
            query,
        }
    }

    fn emit_event(&self, event: DomainEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Allocate ids and build options in input order
    async fn build_options(
        &self,
        question_id: QuestionId,
        params: &[OptionParams],
    ) -> ServiceResult<Vec<AnswerOption>> {
        let mut options = Vec::with_capacity(params.len());
        for (index, option) in params.iter().enumerate() {
            let id = OptionId(self.store.allocate_id(EntityKind::Option).await?);
            options.push(AnswerOption {
                id,
                question_id,
                content: option.content.clone(),
                is_correct: option.is_correct,
                sort_order: option.sort_order.unwrap_or(index as i32),
                explanation: option.explanation.clone(),
            });
        }
        Ok(options)
    }

    /// Deduplicate and check that every category exists
    async fn resolve_categories(&self, ids: &[CategoryId]) -> ServiceResult<BTreeSet<CategoryId>> {
        let wanted: BTreeSet<CategoryId> = ids.iter().copied().collect();
        let ids: Vec<CategoryId> = wanted.iter().copied().collect();
        let found: BTreeSet<CategoryId> = self
            .store
            .get_categories(&ids)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        match wanted.difference(&found).next() {
            Some(missing) => Err(QuestionBankError::not_found(EntityKind::Category, *missing)),
            None => Ok(wanted),
        }
    }

    /// Load tags by id; with `require_all`, a missing id is an error
    async fn load_tags(
        &self,
        ids: &BTreeSet<TagId>,
        require_all: bool,
    ) -> ServiceResult<BTreeMap<TagId, Tag>> {
        let ids: Vec<TagId> = ids.iter().copied().collect();
        let tags: BTreeMap<TagId, Tag> = self
            .store
            .get_tags(&ids)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        if require_all {
            if let Some(missing) = ids.iter().find(|id| !tags.contains_key(id)) {
                return Err(QuestionBankError::not_found(EntityKind::Tag, *missing));
            }
        }
        Ok(tags)
    }

    pub async fn create(&self, params: QuestionParams) -> ServiceResult<Question> {
        let content = params.to_content()?;
        let category_ids = self.resolve_categories(&params.category_ids).await?;
        let tag_ids: BTreeSet<TagId> = params.tag_ids.iter().copied().collect();
        let mut tags = self.load_tags(&tag_ids, true).await?;

        let id = QuestionId(self.store.allocate_id(EntityKind::Question).await?);
        let options = self.build_options(id, &params.options).await?;
        let mut question = Question::new(id, content, options)?;
        question.replace_categories(category_ids)?;
        for tag in tags.values_mut() {
            question.attach_tag(tag);
        }

        let mut changes = ChangeSet::new();
        changes.save_question(question);
        changes.save_tags(tags.into_values());
        self.store.commit(changes).await?;

        let created = self.find(id).await?;
        tracing::info!("Created question {} ({})", id, created.question_type());
        self.emit_event(DomainEvent::QuestionCreated(created.clone()));
        Ok(created)
    }

    /// Replace content, options, categories and tags of a draft question
    pub async fn update(&self, id: QuestionId, params: QuestionParams) -> ServiceResult<Question> {
        let mut question = self.find(id).await?;
        question.ensure_editable()?;

        let content = params.to_content()?;
        let category_ids = self.resolve_categories(&params.category_ids).await?;
        let new_tag_ids: BTreeSet<TagId> = params.tag_ids.iter().copied().collect();
        // Fail on unknown new tags before allocating option ids
        self.load_tags(&new_tag_ids, true).await?;

        let options = self.build_options(id, &params.options).await?;
        question.revise(content, options)?;
        question.replace_categories(category_ids)?;

        let old_tag_ids = question.tag_ids().clone();
        let touched: BTreeSet<TagId> = old_tag_ids.union(&new_tag_ids).copied().collect();
        let mut tags = self.load_tags(&touched, false).await?;
        for old in &old_tag_ids {
            match tags.get_mut(old) {
                Some(tag) => {
                    question.detach_tag(tag);
                }
                None => tracing::warn!("Question {} references missing tag {}", id, old),
            }
        }
        for new in &new_tag_ids {
            match tags.get_mut(new) {
                Some(tag) => {
                    question.attach_tag(tag);
                }
                None => return Err(QuestionBankError::not_found(EntityKind::Tag, *new)),
            }
        }

        let mut changes = ChangeSet::new();
        changes.save_question(question);
        changes.save_tags(tags.into_values());
        self.store.commit(changes).await?;

        let updated = self.find(id).await?;
        tracing::info!("Updated question {}", id);
        self.emit_event(DomainEvent::QuestionUpdated(updated.clone()));
        Ok(updated)
    }

    /// Delete a question with its options, releasing every tag it used
    pub async fn delete(&self, id: QuestionId) -> ServiceResult<()> {
        let mut question = self.find(id).await?;
        let mut tags = self.load_tags(question.tag_ids(), false).await?;
        for tag in tags.values_mut() {
            question.detach_tag(tag);
        }

        let mut changes = ChangeSet::new();
        changes.save_tags(tags.into_values());
        changes.delete_question(question);
        self.store.commit(changes).await?;

        tracing::info!("Deleted question {}", id);
        self.emit_event(DomainEvent::QuestionDeleted { id });
        Ok(())
    }

    pub async fn find(&self, id: QuestionId) -> ServiceResult<Question> {
        self.store
            .get_question(id)
            .await?
            .ok_or_else(|| QuestionBankError::not_found(EntityKind::Question, id))
    }

    /// Draft → Published
    pub async fn publish(&self, id: QuestionId) -> ServiceResult<Question> {
        let mut question = self.find(id).await?;
        question.publish().map_err(|e| {
            tracing::warn!("Rejected publish of question {}: {}", id, e);
            e
        })?;

        let mut changes = ChangeSet::new();
        changes.save_question(question);
        self.store.commit(changes).await?;

        let published = self.find(id).await?;
        tracing::info!("Published question {}", id);
        self.emit_event(DomainEvent::QuestionPublished(published.clone()));
        Ok(published)
    }

    /// Published → Archived
    pub async fn archive(&self, id: QuestionId) -> ServiceResult<Question> {
        let mut question = self.find(id).await?;
        question.archive()?;

        let mut changes = ChangeSet::new();
        changes.save_question(question);
        self.store.commit(changes).await?;

        let archived = self.find(id).await?;
        tracing::info!("Archived question {}", id);
        self.emit_event(DomainEvent::QuestionArchived(archived.clone()));
        Ok(archived)
    }

    pub async fn search(&self, criteria: &SearchCriteria) -> ServiceResult<PaginatedResult<Question>> {
        self.query.execute(criteria).await
    }

    pub async fn random_sample(
        &self,
        n: usize,
        criteria: Option<&SearchCriteria>,
    ) -> ServiceResult<Vec<Question>> {
        self.query.random_sample(n, criteria).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::QuestionStatus;
    use crate::services::error::ErrorKind;
    use crate::services::tag_service::{CreateTagParams, TagService};

    struct Fixture {
        questions: QuestionService,
        tags: TagService,
    }

    fn create_fixture() -> Fixture {
        let (event_tx, _) = broadcast::channel(64);
        let store: Arc<dyn QuestionBankStore> = Arc::new(InMemoryStore::new());
        Fixture {
            questions: QuestionService::new(
                store.clone(),
                event_tx.clone(),
                QueryService::new(store.clone()),
            ),
            tags: TagService::new(store, event_tx),
        }
    }

    fn single_choice(title: &str) -> QuestionParams {
        QuestionParams::new(title, "Pick one", QuestionType::SingleChoice).with_options(vec![
            OptionParams::new("Right", true),
            OptionParams::new("Wrong", false),
        ])
    }

    #[tokio::test]
    async fn test_create_assigns_option_order_and_ids() {
        let f = create_fixture();
        let mut params = single_choice("Ordering");
        params.options[0].sort_order = Some(5);

        let question = f.questions.create(params).await.unwrap();
        assert_eq!(question.status(), QuestionStatus::Draft);
        let contents: Vec<&str> = question.options().iter().map(|o| o.content.as_str()).collect();
        // "Wrong" keeps its index (1), "Right" moved to 5
        assert_eq!(contents, vec!["Wrong", "Right"]);
        assert_ne!(question.options()[0].id, question.options()[1].id);
        assert!(question.options().iter().all(|o| o.question_id == question.id));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_difficulty() {
        let f = create_fixture();
        let err = f
            .questions
            .create(single_choice("Too hard").with_difficulty(6))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_tag() {
        let f = create_fixture();
        let err = f
            .questions
            .create(single_choice("Tagged").with_tags([TagId(42)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_swaps_tags_and_usage() {
        let f = create_fixture();
        let rust = f.tags.create(CreateTagParams::new("Rust")).await.unwrap();
        let go = f.tags.create(CreateTagParams::new("Go")).await.unwrap();

        let question = f
            .questions
            .create(single_choice("Langs").with_tags([rust.id]))
            .await
            .unwrap();
        assert_eq!(f.tags.find(rust.id).await.unwrap().usage_count(), 1);

        let updated = f
            .questions
            .update(question.id, single_choice("Langs").with_tags([go.id]))
            .await
            .unwrap();
        assert!(updated.has_tag(go.id));
        assert!(!updated.has_tag(rust.id));
        assert_eq!(f.tags.find(rust.id).await.unwrap().usage_count(), 0);
        assert_eq!(f.tags.find(go.id).await.unwrap().usage_count(), 1);

        // Options were replaced, not reused
        let old_ids: BTreeSet<OptionId> = question.options().iter().map(|o| o.id).collect();
        assert!(updated.options().iter().all(|o| !old_ids.contains(&o.id)));
    }

    #[tokio::test]
    async fn test_update_after_publish_is_state_error() {
        let f = create_fixture();
        let rust = f.tags.create(CreateTagParams::new("Rust")).await.unwrap();
        let question = f
            .questions
            .create(single_choice("Frozen").with_tags([rust.id]))
            .await
            .unwrap();
        f.questions.publish(question.id).await.unwrap();

        let err = f
            .questions
            .update(question.id, single_choice("Changed"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        let unchanged = f.questions.find(question.id).await.unwrap();
        assert_eq!(unchanged.title(), "Frozen");
        assert_eq!(f.tags.find(rust.id).await.unwrap().usage_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_then_archive() {
        let f = create_fixture();
        let question = f.questions.create(single_choice("Cycle")).await.unwrap();

        let err = f.questions.archive(question.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        let published = f.questions.publish(question.id).await.unwrap();
        assert!(published.is_usable());
        let err = f.questions.publish(question.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        let archived = f.questions.archive(question.id).await.unwrap();
        assert_eq!(archived.status(), QuestionStatus::Archived);
    }

    #[tokio::test]
    async fn test_delete_releases_tags() {
        let f = create_fixture();
        let rust = f.tags.create(CreateTagParams::new("Rust")).await.unwrap();
        let question = f
            .questions
            .create(single_choice("Gone").with_tags([rust.id]))
            .await
            .unwrap();

        f.questions.delete(question.id).await.unwrap();
        assert_eq!(
            f.questions.find(question.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(f.tags.find(rust.id).await.unwrap().usage_count(), 0);
        f.tags.delete(rust.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_essay_takes_no_options() {
        let f = create_fixture();
        let essay = QuestionParams::new("Explain ownership", "In your own words", QuestionType::Essay);
        let question = f.questions.create(essay.clone()).await.unwrap();
        assert!(question.options().is_empty());
        f.questions.publish(question.id).await.unwrap();

        let err = f
            .questions
            .create(essay.with_options(vec![OptionParams::new("No", false)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
