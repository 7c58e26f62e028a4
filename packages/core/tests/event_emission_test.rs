//! Event Emission Tests
//!
//! Verifies that every mutating use case emits exactly one domain event, and
//! only after its change set was committed. Rejected operations emit nothing.

#[cfg(test)]
mod event_emission_tests {
    use anyhow::Result;
    use quizbank_core::db::DomainEvent;
    use quizbank_core::models::QuestionType;
    use quizbank_core::services::{
        CreateCategoryParams, CreateTagParams, OptionParams, QuestionBank, QuestionBankConfig,
        QuestionParams,
    };
    use tokio::sync::broadcast;
    use tokio::time::{timeout, Duration};

    async fn next_event(rx: &mut broadcast::Receiver<DomainEvent>) -> DomainEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Event should be emitted within 1 second")
            .expect("Should receive event")
    }

    fn assert_no_event(rx: &mut broadcast::Receiver<DomainEvent>) {
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    fn true_false(title: &str) -> QuestionParams {
        QuestionParams::new(title, "True or false?", QuestionType::TrueFalse).with_options(vec![
            OptionParams::new("True", true),
            OptionParams::new("False", false),
        ])
    }

    #[tokio::test]
    async fn test_question_lifecycle_events() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let mut rx = bank.subscribe_to_events();

        let question = bank.questions().create(true_false("Sky is blue")).await?;
        match next_event(&mut rx).await {
            DomainEvent::QuestionCreated(created) => {
                assert_eq!(created.id, question.id);
                assert_eq!(created.version, 1);
            }
            other => panic!("Expected QuestionCreated event, got {:?}", other),
        }

        bank.questions().publish(question.id).await?;
        assert_eq!(next_event(&mut rx).await.event_type(), "question:published");

        bank.questions().archive(question.id).await?;
        match next_event(&mut rx).await {
            DomainEvent::QuestionArchived(archived) => {
                assert_eq!(archived.version, 3);
            }
            other => panic!("Expected QuestionArchived event, got {:?}", other),
        }

        bank.questions().delete(question.id).await?;
        assert_eq!(next_event(&mut rx).await.event_type(), "question:deleted");
        assert_no_event(&mut rx);

        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_transition_emits_nothing() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let question = bank.questions().create(true_false("Draft")).await?;

        let mut rx = bank.subscribe_to_events();
        assert!(bank.questions().archive(question.id).await.is_err());
        assert_no_event(&mut rx);

        Ok(())
    }

    #[tokio::test]
    async fn test_category_move_event_lists_subtree() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let a = bank
            .categories()
            .create(CreateCategoryParams::new("A", "a"))
            .await?;
        let b = bank
            .categories()
            .create(CreateCategoryParams::new("B", "b"))
            .await?;
        let leaf = bank
            .categories()
            .create(CreateCategoryParams::new("Leaf", "leaf").with_parent(b.id))
            .await?;

        let mut rx = bank.subscribe_to_events();
        bank.categories().move_category(b.id, Some(a.id)).await?;

        match next_event(&mut rx).await {
            DomainEvent::CategoryMoved {
                id, affected_ids, ..
            } => {
                assert_eq!(id, b.id);
                assert_eq!(affected_ids, vec![b.id, leaf.id]);
            }
            other => panic!("Expected CategoryMoved event, got {:?}", other),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_tag_events() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let mut rx = bank.subscribe_to_events();

        let tag = bank.tags().create(CreateTagParams::new("Rust")).await?;
        assert_eq!(next_event(&mut rx).await.event_type(), "tag:created");

        // Existing tag: no new event
        bank.tags().find_or_create("Rust").await?;
        assert_no_event(&mut rx);

        bank.tags().delete(tag.id).await?;
        match next_event(&mut rx).await {
            DomainEvent::TagDeleted { id } => assert_eq!(id, tag.id),
            other => panic!("Expected TagDeleted event, got {:?}", other),
        }

        Ok(())
    }
}
