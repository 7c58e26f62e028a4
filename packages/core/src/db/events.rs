//! Domain Events
//!
//! This module defines the domain events emitted by the services after a
//! change has been committed. Events follow the observer pattern: any number
//! of subscribers (search indexers, caches, audit writers) can listen without
//! the services knowing about them.
//!
//! # Event Flow
//!
//! 1. A service mutates aggregates and commits one `ChangeSet`
//! 2. Only after a successful commit, the matching event is sent on a tokio
//!    broadcast channel
//! 3. All subscribers receive the event asynchronously

use crate::models::{Category, CategoryId, Question, QuestionId, Tag, TagId};
use serde::Serialize;

/// Domain events emitted by the question bank services
///
/// Serialized adjacently tagged: `{"type": "tagsMerged", "payload": {...}}`.
/// Questions carry their own `type` field, so payloads stay nested.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum DomainEvent {
    CategoryCreated(Category),

    CategoryUpdated(Category),

    /// A category was re-parented; `affected_ids` lists the moved node and
    /// every descendant whose level/path was recomputed
    #[serde(rename_all = "camelCase")]
    CategoryMoved {
        id: CategoryId,
        old_parent_id: Option<CategoryId>,
        new_parent_id: Option<CategoryId>,
        affected_ids: Vec<CategoryId>,
    },

    CategoryDeleted { id: CategoryId },

    TagCreated(Tag),

    TagUpdated(Tag),

    TagDeleted { id: TagId },

    /// Every question that referenced `source_id` now references `target_id`,
    /// and the source tag is gone
    #[serde(rename_all = "camelCase")]
    TagsMerged {
        source_id: TagId,
        target_id: TagId,
        affected_question_ids: Vec<QuestionId>,
    },

    QuestionCreated(Question),

    QuestionUpdated(Question),

    QuestionPublished(Question),

    QuestionArchived(Question),

    QuestionDeleted { id: QuestionId },
}

impl DomainEvent {
    /// Stable `entity:verb` name, for logging and routing
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::CategoryCreated(_) => "category:created",
            DomainEvent::CategoryUpdated(_) => "category:updated",
            DomainEvent::CategoryMoved { .. } => "category:moved",
            DomainEvent::CategoryDeleted { .. } => "category:deleted",
            DomainEvent::TagCreated(_) => "tag:created",
            DomainEvent::TagUpdated(_) => "tag:updated",
            DomainEvent::TagDeleted { .. } => "tag:deleted",
            DomainEvent::TagsMerged { .. } => "tag:merged",
            DomainEvent::QuestionCreated(_) => "question:created",
            DomainEvent::QuestionUpdated(_) => "question:updated",
            DomainEvent::QuestionPublished(_) => "question:published",
            DomainEvent::QuestionArchived(_) => "question:archived",
            DomainEvent::QuestionDeleted { .. } => "question:deleted",
        }
    }
}
