//! Category Service - Hierarchy Use Cases
//!
//! Orchestrates category creation, editing, deletion and re-parenting on top
//! of [`CategoryTree`]. Every use case loads the forest, applies the change in
//! memory (where cycle checks and level/path cascades happen) and commits all
//! touched categories in one [`ChangeSet`], so a half-cascaded subtree is never
//! visible.

use crate::db::{ChangeSet, DomainEvent, QuestionBankStore};
use crate::models::{Category, CategoryId, CategoryNode, CategoryTree, EntityKind};
use crate::services::error::{QuestionBankError, ServiceResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Input for [`CategoryService::create`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryParams {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub valid: Option<bool>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

impl CreateCategoryParams {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: CategoryId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Partial update for [`CategoryService::update`]; `None` leaves a field as is
///
/// An empty `description` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateCategoryParams {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub valid: Option<bool>,
}

pub struct CategoryService {
    store: Arc<dyn QuestionBankStore>,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn QuestionBankStore>, event_tx: broadcast::Sender<DomainEvent>) -> Self {
        Self { store, event_tx }
    }

    fn emit_event(&self, event: DomainEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn load_tree(&self) -> ServiceResult<CategoryTree> {
        let categories = self.store.list_categories().await?;
        Ok(CategoryTree::from_categories(categories))
    }

    async fn ensure_code_available(
        &self,
        code: &str,
        owner: Option<CategoryId>,
    ) -> ServiceResult<()> {
        match self.store.find_category_by_code(code).await? {
            Some(existing) if Some(existing.id) != owner => Err(QuestionBankError::validation(
                "code",
                format!("Category code '{}' already exists", code),
            )),
            _ => Ok(()),
        }
    }

    /// Stage every category in `ids` (as it now is in `tree`) for commit
    fn stage(tree: &CategoryTree, ids: &[CategoryId], changes: &mut ChangeSet) {
        let now = Utc::now();
        for id in ids {
            if let Some(category) = tree.get(*id) {
                let mut category = category.clone();
                category.updated_at = now;
                changes.save_category(category);
            }
        }
    }

    /// Pin `parent_id` and its ancestors to the versions read into `tree`
    ///
    /// A concurrent move or delete anywhere on that chain then fails the
    /// commit instead of leaving a cycle or an orphan behind.
    fn expect_lineage(tree: &CategoryTree, parent_id: Option<CategoryId>, changes: &mut ChangeSet) {
        if let Some(parent_id) = parent_id {
            for category in tree.full_path(parent_id) {
                changes.expect_category(category);
            }
        }
    }

    fn cloned(tree: &CategoryTree, id: CategoryId) -> ServiceResult<Category> {
        tree.get(id)
            .cloned()
            .ok_or_else(|| QuestionBankError::not_found(EntityKind::Category, id))
    }

    /// Create a category, optionally under an existing parent
    pub async fn create(&self, params: CreateCategoryParams) -> ServiceResult<Category> {
        let id = CategoryId(self.store.allocate_id(EntityKind::Category).await?);
        let mut category = Category::new(id, params.name, params.code)?;
        category.description = params.description.filter(|d| !d.trim().is_empty());
        if let Some(sort_order) = params.sort_order {
            category.sort_order = sort_order;
        }
        if let Some(valid) = params.valid {
            category.valid = valid;
        }

        self.ensure_code_available(category.code(), None).await?;

        let mut tree = self.load_tree().await?;
        if let Some(parent_id) = params.parent_id {
            if !tree.contains(parent_id) {
                return Err(QuestionBankError::not_found(EntityKind::Category, parent_id));
            }
        }
        tree.insert(category, params.parent_id)?;

        let mut changes = ChangeSet::new();
        changes.save_category(Self::cloned(&tree, id)?);
        Self::expect_lineage(&tree, params.parent_id, &mut changes);
        self.store.commit(changes).await?;

        let created = self.find(id).await?;

        tracing::info!("Created category {} at {}", created.id, created.path());
        self.emit_event(DomainEvent::CategoryCreated(created.clone()));
        Ok(created)
    }

    /// Edit name, code, description, sort order or validity
    ///
    /// A code change regenerates the path of the whole subtree.
    pub async fn update(&self, id: CategoryId, params: UpdateCategoryParams) -> ServiceResult<Category> {
        let mut tree = self.load_tree().await?;
        let category = tree
            .get_mut(id)
            .ok_or_else(|| QuestionBankError::not_found(EntityKind::Category, id))?;

        if let Some(name) = params.name {
            category.rename(name)?;
        }
        if let Some(description) = params.description {
            category.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(sort_order) = params.sort_order {
            category.sort_order = sort_order;
        }
        if let Some(valid) = params.valid {
            category.valid = valid;
        }

        let mut touched = vec![id];
        if let Some(code) = params.code {
            if code != category.code() {
                Category::validate_code(&code)?;
                self.ensure_code_available(&code, Some(id)).await?;
                touched = tree.set_code(id, code)?;
            }
        }

        let mut changes = ChangeSet::new();
        Self::stage(&tree, &touched, &mut changes);
        self.store.commit(changes).await?;

        let updated = self.find(id).await?;
        tracing::info!(
            "Updated category {} ({} categories touched)",
            id,
            touched.len()
        );
        self.emit_event(DomainEvent::CategoryUpdated(updated.clone()));
        Ok(updated)
    }

    /// Delete a childless category and drop it from every question
    pub async fn delete(&self, id: CategoryId) -> ServiceResult<()> {
        let tree = self.load_tree().await?;
        let category = Self::cloned(&tree, id)?;

        let children = tree.children_of(id).len();
        if children > 0 {
            tracing::warn!("Refusing to delete category {} with {} children", id, children);
            return Err(QuestionBankError::validation(
                "children",
                format!("Category has {} child categories", children),
            ));
        }

        let mut changes = ChangeSet::new();
        for mut question in self.store.find_questions_by_category(id).await? {
            if question.remove_category(id) {
                changes.save_question(question);
            }
        }
        changes.delete_category(category);
        self.store.commit(changes).await?;

        tracing::info!("Deleted category {}", id);
        self.emit_event(DomainEvent::CategoryDeleted { id });
        Ok(())
    }

    /// Re-parent a category (or make it a root with `None`)
    ///
    /// The category and its whole subtree get fresh level and path values.
    pub async fn move_category(
        &self,
        id: CategoryId,
        new_parent_id: Option<CategoryId>,
    ) -> ServiceResult<()> {
        let mut tree = self.load_tree().await?;
        let old_parent_id = tree
            .get(id)
            .ok_or_else(|| QuestionBankError::not_found(EntityKind::Category, id))?
            .parent_id();
        if let Some(parent_id) = new_parent_id {
            if !tree.contains(parent_id) {
                return Err(QuestionBankError::not_found(EntityKind::Category, parent_id));
            }
        }

        let affected = tree.set_parent(id, new_parent_id).map_err(|e| {
            tracing::warn!("Rejected move of category {}: {}", id, e);
            e
        })?;

        let mut changes = ChangeSet::new();
        Self::stage(&tree, &affected, &mut changes);
        Self::expect_lineage(&tree, new_parent_id, &mut changes);
        self.store.commit(changes).await?;

        tracing::info!(
            "Moved category {} from {:?} to {:?} ({} categories recomputed)",
            id,
            old_parent_id,
            new_parent_id,
            affected.len()
        );
        self.emit_event(DomainEvent::CategoryMoved {
            id,
            old_parent_id,
            new_parent_id,
            affected_ids: affected,
        });
        Ok(())
    }

    pub async fn find(&self, id: CategoryId) -> ServiceResult<Category> {
        self.store
            .get_category(id)
            .await?
            .ok_or_else(|| QuestionBankError::not_found(EntityKind::Category, id))
    }

    pub async fn find_by_code(&self, code: &str) -> ServiceResult<Option<Category>> {
        Ok(self.store.find_category_by_code(code).await?)
    }

    /// Nested forest of valid categories, siblings by sort order then name
    pub async fn find_tree(&self) -> ServiceResult<Vec<CategoryNode>> {
        Ok(self.load_tree().await?.nested(true))
    }

    /// Ancestors from the root down, followed by the category itself
    pub async fn find_path(&self, id: CategoryId) -> ServiceResult<Vec<Category>> {
        let tree = self.load_tree().await?;
        if !tree.contains(id) {
            return Err(QuestionBankError::not_found(EntityKind::Category, id));
        }
        Ok(tree.full_path(id).into_iter().cloned().collect())
    }

    /// Direct children of `id`, valid or not
    pub async fn find_children(&self, id: CategoryId) -> ServiceResult<Vec<Category>> {
        let tree = self.load_tree().await?;
        if !tree.contains(id) {
            return Err(QuestionBankError::not_found(EntityKind::Category, id));
        }
        Ok(tree.children_of(id).into_iter().cloned().collect())
    }

    /// Valid roots ordered by sort order, then name
    pub async fn find_roots(&self) -> ServiceResult<Vec<Category>> {
        let tree = self.load_tree().await?;
        Ok(tree
            .roots()
            .into_iter()
            .filter(|c| c.valid)
            .cloned()
            .collect())
    }

    /// All valid categories ordered by level, sort order, then name
    pub async fn find_active(&self) -> ServiceResult<Vec<Category>> {
        let mut active: Vec<Category> = self
            .store
            .list_categories()
            .await?
            .into_iter()
            .filter(|c| c.valid)
            .collect();
        active.sort_by(|a, b| {
            a.level()
                .cmp(&b.level())
                .then(a.sort_order.cmp(&b.sort_order))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(active)
    }
}
