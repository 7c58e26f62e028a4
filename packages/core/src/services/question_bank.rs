//! QuestionBank - Service Container
//!
//! Wires one store, one event channel and one configuration into the
//! category, tag, question and query services so embedding applications
//! only construct a single value.

use crate::db::{DomainEvent, InMemoryStore, QuestionBankStore};
use crate::services::category_service::CategoryService;
use crate::services::config::QuestionBankConfig;
use crate::services::query_service::QueryService;
use crate::services::question_service::QuestionService;
use crate::services::tag_service::TagService;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct QuestionBank {
    config: QuestionBankConfig,
    store: Arc<dyn QuestionBankStore>,
    event_tx: broadcast::Sender<DomainEvent>,
    categories: CategoryService,
    tags: TagService,
    questions: QuestionService,
}

impl QuestionBank {
    pub fn new(store: Arc<dyn QuestionBankStore>, config: QuestionBankConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        let query = QueryService::new(store.clone()).with_default_limit(config.default_page_limit);
        let categories = CategoryService::new(store.clone(), event_tx.clone());
        let tags = TagService::new(store.clone(), event_tx.clone())
            .with_popular_limit(config.popular_tags_limit);
        let questions = QuestionService::new(store.clone(), event_tx.clone(), query);

        tracing::debug!(
            "Question bank ready (page limit {}, event capacity {})",
            config.default_page_limit,
            config.event_channel_capacity
        );

        Self {
            config,
            store,
            event_tx,
            categories,
            tags,
            questions,
        }
    }

    /// Question bank over a fresh [`InMemoryStore`]
    pub fn in_memory(config: QuestionBankConfig) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), config)
    }

    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    pub fn tags(&self) -> &TagService {
        &self.tags
    }

    pub fn questions(&self) -> &QuestionService {
        &self.questions
    }

    pub fn config(&self) -> &QuestionBankConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn QuestionBankStore> {
        self.store.clone()
    }

    /// Receive every domain event emitted after this call
    ///
    /// Events are only sent once their change set has been committed.
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::category_service::CreateCategoryParams;
    use crate::services::tag_service::CreateTagParams;

    #[tokio::test]
    async fn test_services_share_store_and_events() {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let mut rx = bank.subscribe_to_events();

        let category = bank
            .categories()
            .create(CreateCategoryParams::new("Technology", "tech"))
            .await
            .unwrap();
        bank.tags().create(CreateTagParams::new("Rust")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().event_type(), "category:created");
        assert_eq!(rx.recv().await.unwrap().event_type(), "tag:created");
        assert!(bank
            .store()
            .get_category(category.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_failed_operation_emits_nothing() {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let mut rx = bank.subscribe_to_events();

        assert!(bank
            .tags()
            .create(CreateTagParams::new("Bad").with_color("blue"))
            .await
            .is_err());
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
