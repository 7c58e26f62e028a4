//! Tag Service - Folksonomy Use Cases
//!
//! Tags are created standalone but their usage count only ever moves through
//! [`Question::attach_tag`](crate::models::Question::attach_tag) and
//! [`Question::detach_tag`](crate::models::Question::detach_tag). Merging
//! goes through the same path, so counts stay correct without any manual
//! arithmetic here.

use crate::db::{ChangeSet, DomainEvent, QuestionBankStore};
use crate::models::{EntityKind, QuestionId, Tag, TagId};
use crate::services::config::DEFAULT_POPULAR_TAGS_LIMIT;
use crate::services::error::{QuestionBankError, ServiceResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Input for [`TagService::create`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagParams {
    pub name: String,
    /// Derived from `name` when absent
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl CreateTagParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Partial update for [`TagService::update`]
///
/// Renaming without a slug re-derives the slug from the new name. Empty
/// `description` or `color` clears the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateTagParams {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

pub struct TagService {
    store: Arc<dyn QuestionBankStore>,
    event_tx: broadcast::Sender<DomainEvent>,
    popular_limit: usize,
}

impl TagService {
    pub fn new(store: Arc<dyn QuestionBankStore>, event_tx: broadcast::Sender<DomainEvent>) -> Self {
        Self {
            store,
            event_tx,
            popular_limit: DEFAULT_POPULAR_TAGS_LIMIT,
        }
    }

    /// Override how many tags [`find_popular`](Self::find_popular) returns by default
    pub fn with_popular_limit(mut self, limit: usize) -> Self {
        self.popular_limit = limit;
        self
    }

    fn emit_event(&self, event: DomainEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn ensure_slug_available(&self, slug: &str, owner: Option<TagId>) -> ServiceResult<()> {
        match self.store.find_tag_by_slug(slug).await? {
            Some(existing) if Some(existing.id) != owner => Err(QuestionBankError::validation(
                "slug",
                format!("Tag slug '{}' already exists", slug),
            )),
            _ => Ok(()),
        }
    }

    pub async fn create(&self, params: CreateTagParams) -> ServiceResult<Tag> {
        // Validate before reserving an id
        let slug = Tag::resolve_slug(&params.name, params.slug)?;
        self.ensure_slug_available(&slug, None).await?;

        let id = TagId(self.store.allocate_id(EntityKind::Tag).await?);
        let mut tag = Tag::new(id, params.name, Some(slug))?;
        tag.description = params.description.filter(|d| !d.trim().is_empty());
        tag.set_color(params.color.filter(|c| !c.is_empty()))?;

        let mut changes = ChangeSet::new();
        changes.save_tag(tag);
        self.store.commit(changes).await?;

        let created = self.find(id).await?;
        tracing::info!("Created tag {} ({})", created.id, created.slug());
        self.emit_event(DomainEvent::TagCreated(created.clone()));
        Ok(created)
    }

    pub async fn update(&self, id: TagId, params: UpdateTagParams) -> ServiceResult<Tag> {
        let mut tag = self.find(id).await?;

        if params.name.is_some() || params.slug.is_some() {
            let name = params.name.unwrap_or_else(|| tag.name().to_string());
            tag.rename(name, params.slug)?;
            self.ensure_slug_available(tag.slug(), Some(id)).await?;
        }
        if let Some(description) = params.description {
            tag.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(color) = params.color {
            tag.set_color(Some(color).filter(|c| !c.is_empty()))?;
        }
        tag.updated_at = Utc::now();

        let mut changes = ChangeSet::new();
        changes.save_tag(tag);
        self.store.commit(changes).await?;

        let updated = self.find(id).await?;
        tracing::info!("Updated tag {}", id);
        self.emit_event(DomainEvent::TagUpdated(updated.clone()));
        Ok(updated)
    }

    /// Delete an unused tag
    pub async fn delete(&self, id: TagId) -> ServiceResult<()> {
        let tag = self.find(id).await?;
        if tag.is_in_use() {
            tracing::warn!(
                "Refusing to delete tag {} used by {} questions",
                id,
                tag.usage_count()
            );
            return Err(QuestionBankError::validation(
                "usageCount",
                format!("Tag is used by {} questions", tag.usage_count()),
            ));
        }

        let mut changes = ChangeSet::new();
        changes.delete_tag(tag);
        self.store.commit(changes).await?;

        tracing::info!("Deleted tag {}", id);
        self.emit_event(DomainEvent::TagDeleted { id });
        Ok(())
    }

    pub async fn find(&self, id: TagId) -> ServiceResult<Tag> {
        self.store
            .get_tag(id)
            .await?
            .ok_or_else(|| QuestionBankError::not_found(EntityKind::Tag, id))
    }

    pub async fn find_all(&self) -> ServiceResult<Vec<Tag>> {
        Ok(self.store.list_tags().await?)
    }

    pub async fn find_by_slug(&self, slug: &str) -> ServiceResult<Option<Tag>> {
        Ok(self.store.find_tag_by_slug(slug).await?)
    }

    /// Tag with exactly this name, created (with a derived slug) if missing
    pub async fn find_or_create(&self, name: &str) -> ServiceResult<Tag> {
        if let Some(existing) = self.store.find_tag_by_name(name).await? {
            return Ok(existing);
        }
        self.create(CreateTagParams::new(name)).await
    }

    /// Move every question from `source_id` to `target_id`, then delete the source
    ///
    /// Returns the target tag with its new usage count.
    pub async fn merge(&self, source_id: TagId, target_id: TagId) -> ServiceResult<Tag> {
        if source_id == target_id {
            return Err(QuestionBankError::validation(
                "targetId",
                "Cannot merge a tag into itself",
            ));
        }
        let mut source = self.find(source_id).await?;
        let mut target = self.find(target_id).await?;

        let mut changes = ChangeSet::new();
        let mut affected: Vec<QuestionId> = Vec::new();
        for mut question in self.store.find_questions_by_tag(source_id).await? {
            question.detach_tag(&mut source);
            question.attach_tag(&mut target);
            affected.push(question.id);
            changes.save_question(question);
        }
        target.updated_at = Utc::now();
        changes.save_tag(target);
        changes.delete_tag(source);
        self.store.commit(changes).await?;

        tracing::info!(
            "Merged tag {} into {} ({} questions reassigned)",
            source_id,
            target_id,
            affected.len()
        );
        self.emit_event(DomainEvent::TagsMerged {
            source_id,
            target_id,
            affected_question_ids: affected,
        });
        self.find(target_id).await
    }

    /// Tags whose name or slug contains `keyword` (case-insensitive), most used first
    pub async fn search(&self, keyword: &str, limit: Option<usize>) -> ServiceResult<Vec<Tag>> {
        let needle = keyword.trim().to_lowercase();
        let mut tags: Vec<Tag> = self
            .store
            .list_tags()
            .await?
            .into_iter()
            .filter(|t| {
                needle.is_empty()
                    || t.name().to_lowercase().contains(&needle)
                    || t.slug().contains(&needle)
            })
            .collect();
        sort_by_popularity(&mut tags);
        if let Some(limit) = limit {
            tags.truncate(limit);
        }
        Ok(tags)
    }

    /// Most used tags first; ties broken by name
    pub async fn find_popular(&self, limit: Option<usize>) -> ServiceResult<Vec<Tag>> {
        let mut tags = self.store.list_tags().await?;
        sort_by_popularity(&mut tags);
        tags.truncate(limit.unwrap_or(self.popular_limit));
        Ok(tags)
    }
}

fn sort_by_popularity(tags: &mut [Tag]) {
    tags.sort_by(|a, b| {
        Reverse(a.usage_count())
            .cmp(&Reverse(b.usage_count()))
            .then_with(|| a.name().cmp(b.name()))
            .then(a.id.cmp(&b.id))
    });
}
