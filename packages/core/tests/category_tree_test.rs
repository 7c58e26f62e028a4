//! Category Hierarchy Tests
//!
//! Integration tests for the category tree through the service layer:
//! cycle rejection, level/path cascades on re-parent and re-code, and
//! category deletion.

#[cfg(test)]
mod category_tree_tests {
    use anyhow::Result;
    use quizbank_core::db::QuestionBankStore;
    use quizbank_core::models::{Category, CategoryId, CategoryTree, QuestionType};
    use quizbank_core::services::{
        CreateCategoryParams, ErrorKind, QuestionBank, QuestionBankConfig, QuestionParams,
        UpdateCategoryParams,
    };

    async fn create(
        bank: &QuestionBank,
        name: &str,
        code: &str,
        parent: Option<CategoryId>,
    ) -> Result<Category> {
        let mut params = CreateCategoryParams::new(name, code);
        params.parent_id = parent;
        Ok(bank.categories().create(params).await?)
    }

    /// root -> a -> b -> c
    async fn create_chain(bank: &QuestionBank) -> Result<[Category; 4]> {
        let root = create(bank, "Root", "root", None).await?;
        let a = create(bank, "A", "a", Some(root.id)).await?;
        let b = create(bank, "B", "b", Some(a.id)).await?;
        let c = create(bank, "C", "c", Some(b.id)).await?;
        Ok([root, a, b, c])
    }

    async fn assert_tree_consistent(bank: &QuestionBank) -> Result<()> {
        let tree = CategoryTree::from_categories(bank.store().list_categories().await?);
        assert!(tree.is_consistent(), "cached level/path out of sync");
        Ok(())
    }

    #[tokio::test]
    async fn test_cycle_rejected_and_tree_unchanged() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let [root, _a, _b, c] = create_chain(&bank).await?;

        let before = bank.store().list_categories().await?;
        let err = bank
            .categories()
            .move_category(root.id, Some(c.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Hierarchy);

        let after = bank.store().list_categories().await?;
        assert_eq!(before, after);
        Ok(())
    }

    #[tokio::test]
    async fn test_reparent_cascades_level_and_path() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let root = create(&bank, "Root", "root", None).await?;
        let child = create(&bank, "Child", "child", Some(root.id)).await?;
        let grandchild = create(&bank, "Grandchild", "grandchild", Some(child.id)).await?;
        assert_eq!(grandchild.level(), 2);
        assert_eq!(grandchild.path(), "/root/child/grandchild");

        bank.categories().move_category(child.id, None).await?;

        let child = bank.categories().find(child.id).await?;
        let grandchild = bank.categories().find(grandchild.id).await?;
        assert_eq!(child.level(), 0);
        assert_eq!(child.path(), "/child");
        assert_eq!(grandchild.level(), 1);
        assert_eq!(grandchild.path(), "/child/grandchild");

        assert_tree_consistent(&bank).await
    }

    #[tokio::test]
    async fn test_move_subtree_under_other_branch() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let [_root, a, b, c] = create_chain(&bank).await?;
        let other = create(&bank, "Other", "other", None).await?;

        bank.categories().move_category(b.id, Some(other.id)).await?;

        let path: Vec<String> = bank
            .categories()
            .find_path(c.id)
            .await?
            .iter()
            .map(|c| c.code().to_string())
            .collect();
        assert_eq!(path, vec!["other", "b", "c"]);
        assert!(bank.categories().find_children(a.id).await?.is_empty());

        assert_tree_consistent(&bank).await
    }

    #[tokio::test]
    async fn test_recode_regenerates_descendant_paths() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let [_root, a, _b, c] = create_chain(&bank).await?;

        bank.categories()
            .update(
                a.id,
                UpdateCategoryParams {
                    code: Some("alpha".to_string()),
                    ..Default::default()
                },
            )
            .await?;

        assert_eq!(
            bank.categories().find(c.id).await?.path(),
            "/root/alpha/b/c"
        );
        assert_tree_consistent(&bank).await
    }

    #[tokio::test]
    async fn test_delete_leaf_removes_question_references() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let root = create(&bank, "Root", "root", None).await?;
        let leaf = create(&bank, "Leaf", "leaf", Some(root.id)).await?;

        let question = bank
            .questions()
            .create(
                QuestionParams::new("Essay", "Discuss", QuestionType::Essay)
                    .with_categories([root.id, leaf.id]),
            )
            .await?;

        let err = bank.categories().delete(root.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        bank.categories().delete(leaf.id).await?;
        let question = bank.questions().find(question.id).await?;
        assert!(question.in_category(root.id));
        assert!(!question.in_category(leaf.id));
        assert_eq!(
            bank.categories().find(leaf.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_tree_nests_by_sort_order() -> Result<()> {
        let bank = QuestionBank::in_memory(QuestionBankConfig::default());
        let root = create(&bank, "Root", "root", None).await?;
        bank.categories()
            .create(
                CreateCategoryParams::new("Zeta", "zeta")
                    .with_parent(root.id)
                    .with_sort_order(1),
            )
            .await?;
        bank.categories()
            .create(
                CreateCategoryParams::new("Alpha", "alpha")
                    .with_parent(root.id)
                    .with_sort_order(2),
            )
            .await?;

        let tree = bank.categories().find_tree().await?;
        assert_eq!(tree.len(), 1);
        let names: Vec<&str> = tree[0]
            .children
            .iter()
            .map(|n| n.category.name.as_str())
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);

        let json = serde_json::to_value(&tree)?;
        assert_eq!(json[0]["children"][0]["code"], "zeta");
        Ok(())
    }
}
