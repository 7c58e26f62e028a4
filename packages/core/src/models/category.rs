//! Category Hierarchy
//!
//! Categories form a forest addressed by [`CategoryId`]. Each category caches
//! its depth (`level`) and its materialized `path` of codes from the root,
//! e.g. `/tech/programming/rust`.
//!
//! # Architecture
//!
//! - **Arena, not pointers**: [`CategoryTree`] owns every node in an ordered
//!   map; parent links are ids and children are derived by scanning them.
//! - **Eager cache maintenance**: any re-parent or re-code recomputes `level`
//!   and `path` for the node and its whole subtree with an explicit stack.
//! - **Cycle prevention**: a re-parent first walks the new parent's ancestor
//!   chain; finding the moved node there rejects the move untouched.
//!
//! # Examples
//!
//! ```rust
//! use quizbank_core::models::{Category, CategoryId, CategoryTree};
//!
//! let mut tree = CategoryTree::new();
//! tree.insert(Category::new(CategoryId(1), "Tech", "tech").unwrap(), None).unwrap();
//! tree.insert(Category::new(CategoryId(2), "Rust", "rust").unwrap(), Some(CategoryId(1))).unwrap();
//!
//! let rust = tree.get(CategoryId(2)).unwrap();
//! assert_eq!(rust.level(), 1);
//! assert_eq!(rust.path(), "/tech/rust");
//! ```

use super::validation::check_text;
use super::{CategoryId, ValidationError};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use thiserror::Error;

pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;
pub const MAX_CATEGORY_CODE_LENGTH: usize = 50;

static CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());

/// Structural violations of the category forest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("Category {id} cannot be its own parent")]
    SelfParent { id: CategoryId },

    #[error("Cannot set descendant {parent_id} as parent of category {id}")]
    DescendantAsParent {
        id: CategoryId,
        parent_id: CategoryId,
    },

    #[error("Category {id} still has {count} children")]
    HasChildren { id: CategoryId, count: usize },

    #[error("Category {0} is not part of the tree")]
    UnknownCategory(CategoryId),
}

fn default_valid() -> bool {
    true
}

/// A node of the category forest
///
/// Structural fields (`code`, `parent_id`, `level`, `path`) are only mutated
/// through [`CategoryTree`], which keeps the caches consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    code: String,
    pub description: Option<String>,
    /// Tie-break among siblings
    #[serde(default)]
    pub sort_order: i32,
    /// Soft-disable flag; invalid categories stay addressable but are hidden from listings
    #[serde(default = "default_valid")]
    pub valid: bool,
    parent_id: Option<CategoryId>,
    level: u32,
    path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency version, bumped by the store on every commit
    #[serde(default)]
    pub version: i64,
}

impl Category {
    /// Create a root category (level 0, path `/code`)
    pub fn new(
        id: CategoryId,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let code = code.into();

        let mut errors = ValidationError::new();
        check_text(&mut errors, "name", &name, Some(MAX_CATEGORY_NAME_LENGTH));
        if let Err(e) = Self::validate_code(&code) {
            errors.merge(e);
        }
        errors.into_result()?;

        let now = Utc::now();
        let path = format!("/{}", code);
        Ok(Self {
            id,
            name,
            code,
            description: None,
            sort_order: 0,
            valid: true,
            parent_id: None,
            level: 0,
            path,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Codes are path segments, so they may not contain `/` or whitespace
    pub fn validate_code(code: &str) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        check_text(&mut errors, "code", code, Some(MAX_CATEGORY_CODE_LENGTH));
        if errors.is_empty() && !CODE_PATTERN.is_match(code) {
            errors.push(
                "code",
                "may only contain letters, digits, '_', '.' and '-'",
            );
        }
        errors.into_result()
    }

    /// Rename without touching the hierarchy
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), ValidationError> {
        let name = name.into();
        let mut errors = ValidationError::new();
        check_text(&mut errors, "name", &name, Some(MAX_CATEGORY_NAME_LENGTH));
        errors.into_result()?;
        self.name = name;
        Ok(())
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn parent_id(&self) -> Option<CategoryId> {
        self.parent_id
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    fn sibling_order(&self, other: &Category) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A category together with its nested (already ordered) children
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Id-indexed arena holding a category forest
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: BTreeMap<CategoryId, Category>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from categories as loaded from storage
    ///
    /// Cached `level`/`path` values are taken as stored; use
    /// [`is_consistent`](Self::is_consistent) to verify them.
    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            nodes: categories.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)
    }

    /// Mutable access for non-structural fields (name, description, sort order, valid)
    pub fn get_mut(&mut self, id: CategoryId) -> Option<&mut Category> {
        self.nodes.get_mut(&id)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.nodes.values()
    }

    /// Insert a category and attach it under `parent`
    ///
    /// Returns the ids whose cached level/path were (re)computed.
    pub fn insert(
        &mut self,
        mut category: Category,
        parent: Option<CategoryId>,
    ) -> Result<Vec<CategoryId>, HierarchyError> {
        let id = category.id;
        if let Some(parent_id) = parent {
            if parent_id == id {
                return Err(HierarchyError::SelfParent { id });
            }
            if !self.contains(parent_id) {
                return Err(HierarchyError::UnknownCategory(parent_id));
            }
        }
        category.parent_id = None;
        self.nodes.insert(id, category);
        self.set_parent(id, parent)
    }

    /// Remove a leaf category
    pub fn remove(&mut self, id: CategoryId) -> Result<Category, HierarchyError> {
        if !self.contains(id) {
            return Err(HierarchyError::UnknownCategory(id));
        }
        let count = self.child_ids(id).len();
        if count > 0 {
            return Err(HierarchyError::HasChildren { id, count });
        }
        self.nodes
            .remove(&id)
            .ok_or(HierarchyError::UnknownCategory(id))
    }

    /// Re-parent `id` under `new_parent` (or make it a root)
    ///
    /// Rejects self-parenting and moving a node under one of its own
    /// descendants, leaving the tree unchanged. On success the node and its
    /// entire subtree get fresh `level` and `path` values; their ids are
    /// returned, the moved node first.
    pub fn set_parent(
        &mut self,
        id: CategoryId,
        new_parent: Option<CategoryId>,
    ) -> Result<Vec<CategoryId>, HierarchyError> {
        if !self.contains(id) {
            return Err(HierarchyError::UnknownCategory(id));
        }
        if let Some(parent_id) = new_parent {
            if parent_id == id {
                return Err(HierarchyError::SelfParent { id });
            }
            if !self.contains(parent_id) {
                return Err(HierarchyError::UnknownCategory(parent_id));
            }
            if self.is_descendant_of(parent_id, id) {
                return Err(HierarchyError::DescendantAsParent { id, parent_id });
            }
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent_id = new_parent;
        }
        Ok(self.recompute_subtree(id))
    }

    /// Change the code of `id`, regenerating paths for its subtree
    pub fn set_code(
        &mut self,
        id: CategoryId,
        code: impl Into<String>,
    ) -> Result<Vec<CategoryId>, HierarchyError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(HierarchyError::UnknownCategory(id))?;
        node.code = code.into();
        Ok(self.recompute_subtree(id))
    }

    /// True if `ancestor` appears on the parent chain of `id`
    pub fn is_ancestor_of(&self, ancestor: CategoryId, id: CategoryId) -> bool {
        self.is_descendant_of(id, ancestor)
    }

    /// True if `ancestor` appears on the parent chain of `id`
    pub fn is_descendant_of(&self, id: CategoryId, ancestor: CategoryId) -> bool {
        self.ancestor_ids(id).contains(&ancestor)
    }

    /// Ancestors ordered from the root down to the direct parent
    pub fn ancestors(&self, id: CategoryId) -> Vec<&Category> {
        let mut ids = self.ancestor_ids(id);
        ids.reverse();
        ids.iter().filter_map(|a| self.nodes.get(a)).collect()
    }

    /// Ancestors followed by the category itself
    pub fn full_path(&self, id: CategoryId) -> Vec<&Category> {
        let mut chain = self.ancestors(id);
        if let Some(node) = self.nodes.get(&id) {
            chain.push(node);
        }
        chain
    }

    /// Direct children ordered by sort order, then name
    pub fn children_of(&self, id: CategoryId) -> Vec<&Category> {
        let mut children: Vec<&Category> = self
            .nodes
            .values()
            .filter(|c| c.parent_id == Some(id))
            .collect();
        children.sort_by(|a, b| a.sibling_order(b));
        children
    }

    /// Root categories ordered by sort order, then name
    pub fn roots(&self) -> Vec<&Category> {
        let mut roots: Vec<&Category> = self.nodes.values().filter(|c| c.is_root()).collect();
        roots.sort_by(|a, b| a.sibling_order(b));
        roots
    }

    /// Every descendant of `id` in depth-first pre-order
    pub fn descendants_of(&self, id: CategoryId) -> Vec<CategoryId> {
        let index = self.child_index();
        let mut result = Vec::new();
        let mut stack: Vec<CategoryId> = index.get(&id).cloned().unwrap_or_default();
        stack.reverse();
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(children) = index.get(&current) {
                stack.extend(children.iter().rev().copied());
            }
        }
        result
    }

    /// Nested projection of the forest
    ///
    /// With `valid_only`, invalid categories are dropped together with their
    /// subtrees. Siblings are ordered by sort order, then name.
    pub fn nested(&self, valid_only: bool) -> Vec<CategoryNode> {
        let index = self.child_index();
        let included = |c: &Category| !valid_only || c.valid;

        let roots: Vec<CategoryId> = self
            .roots()
            .into_iter()
            .filter(|c| included(*c))
            .map(|c| c.id)
            .collect();

        // Pre-order walk over included nodes; building in reverse order
        // guarantees every child is assembled before its parent.
        let mut order = Vec::new();
        let mut stack: Vec<CategoryId> = roots.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            order.push(current);
            if let Some(children) = index.get(&current) {
                for child in children.iter().rev() {
                    if self.nodes.get(child).is_some_and(&included) {
                        stack.push(*child);
                    }
                }
            }
        }

        let mut built: HashMap<CategoryId, CategoryNode> = HashMap::with_capacity(order.len());
        for id in order.into_iter().rev() {
            let Some(category) = self.nodes.get(&id) else {
                continue;
            };
            let children = index
                .get(&id)
                .map(|ids| ids.iter().filter_map(|c| built.remove(c)).collect())
                .unwrap_or_default();
            built.insert(
                id,
                CategoryNode {
                    category: category.clone(),
                    children,
                },
            );
        }

        roots.iter().filter_map(|id| built.remove(id)).collect()
    }

    /// Check the cached `level`/`path` of every node against its parent chain
    pub fn is_consistent(&self) -> bool {
        self.nodes.values().all(|node| match node.parent_id {
            None => node.level == 0 && node.path == format!("/{}", node.code),
            Some(parent_id) => match self.nodes.get(&parent_id) {
                Some(parent) => {
                    node.level == parent.level + 1
                        && node.path == format!("{}/{}", parent.path, node.code)
                }
                None => false,
            },
        })
    }

    /// Parent chain of `id`, nearest first
    fn ancestor_ids(&self, id: CategoryId) -> Vec<CategoryId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.nodes.get(&id).and_then(|c| c.parent_id);
        while let Some(parent_id) = current {
            // Stored data could already contain a loop; stop instead of spinning.
            if !seen.insert(parent_id) {
                tracing::warn!("Category parent chain of {} contains a loop", id);
                break;
            }
            chain.push(parent_id);
            current = self.nodes.get(&parent_id).and_then(|c| c.parent_id);
        }
        chain
    }

    fn child_ids(&self, id: CategoryId) -> Vec<CategoryId> {
        self.children_of(id).into_iter().map(|c| c.id).collect()
    }

    /// Parent id → ordered child ids
    fn child_index(&self) -> HashMap<CategoryId, Vec<CategoryId>> {
        let mut index: HashMap<CategoryId, Vec<&Category>> = HashMap::new();
        for node in self.nodes.values() {
            if let Some(parent_id) = node.parent_id {
                index.entry(parent_id).or_default().push(node);
            }
        }
        index
            .into_iter()
            .map(|(parent, mut children)| {
                children.sort_by(|a, b| a.sibling_order(b));
                (parent, children.into_iter().map(|c| c.id).collect())
            })
            .collect()
    }

    /// Recompute level/path for `root` and everything below it
    fn recompute_subtree(&mut self, root: CategoryId) -> Vec<CategoryId> {
        let index = self.child_index();
        let mut touched = Vec::new();
        let mut stack = vec![root];
        let mut seen = HashSet::new();

        while let Some(id) = stack.pop() {
            // A cycle loaded from storage must not loop forever
            if !seen.insert(id) {
                continue;
            }
            let parent_cache = self
                .nodes
                .get(&id)
                .and_then(|c| c.parent_id)
                .and_then(|p| self.nodes.get(&p))
                .map(|p| (p.level, p.path.clone()));

            if let Some(node) = self.nodes.get_mut(&id) {
                match parent_cache {
                    Some((level, path)) => {
                        node.level = level + 1;
                        node.path = format!("{}/{}", path, node.code);
                    }
                    None => {
                        node.level = 0;
                        node.path = format!("/{}", node.code);
                    }
                }
                touched.push(id);
            }

            if let Some(children) = index.get(&id) {
                stack.extend(children.iter().rev().copied());
            }
        }

        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, code: &str) -> Category {
        Category::new(CategoryId(id), code.to_uppercase(), code).unwrap()
    }

    /// root(1) → a(2) → b(3) → c(4)
    fn chain() -> CategoryTree {
        let mut tree = CategoryTree::new();
        tree.insert(category(1, "root"), None).unwrap();
        tree.insert(category(2, "a"), Some(CategoryId(1))).unwrap();
        tree.insert(category(3, "b"), Some(CategoryId(2))).unwrap();
        tree.insert(category(4, "c"), Some(CategoryId(3))).unwrap();
        tree
    }

    #[test]
    fn test_new_category_is_root() {
        let c = category(1, "tech");
        assert!(c.is_root());
        assert_eq!(c.level(), 0);
        assert_eq!(c.path(), "/tech");
    }

    #[test]
    fn test_code_validation() {
        assert!(Category::validate_code("php-7.4_x").is_ok());
        assert!(Category::validate_code("a/b").is_err());
        assert!(Category::validate_code("has space").is_err());
        assert!(Category::validate_code("").is_err());
        assert!(Category::new(CategoryId(1), "", "ok").is_err());
    }

    #[test]
    fn test_insert_computes_level_and_path() {
        let tree = chain();
        let c = tree.get(CategoryId(4)).unwrap();
        assert_eq!(c.level(), 3);
        assert_eq!(c.path(), "/root/a/b/c");
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_self_parent_rejected() {
        let mut tree = chain();
        let err = tree.set_parent(CategoryId(2), Some(CategoryId(2))).unwrap_err();
        assert_eq!(err, HierarchyError::SelfParent { id: CategoryId(2) });
    }

    #[test]
    fn test_cycle_rejected_and_tree_unchanged() {
        let mut tree = chain();
        let before: Vec<Category> = tree.categories().cloned().collect();

        let err = tree.set_parent(CategoryId(1), Some(CategoryId(4))).unwrap_err();
        assert!(matches!(err, HierarchyError::DescendantAsParent { .. }));

        let after: Vec<Category> = tree.categories().cloned().collect();
        assert_eq!(before, after);
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_reparent_to_root_cascades() {
        let mut tree = CategoryTree::new();
        tree.insert(category(1, "root"), None).unwrap();
        tree.insert(category(2, "child"), Some(CategoryId(1))).unwrap();
        tree.insert(category(3, "grandchild"), Some(CategoryId(2))).unwrap();

        let touched = tree.set_parent(CategoryId(2), None).unwrap();
        assert_eq!(touched, vec![CategoryId(2), CategoryId(3)]);

        let child = tree.get(CategoryId(2)).unwrap();
        assert_eq!(child.level(), 0);
        assert_eq!(child.path(), "/child");

        let grandchild = tree.get(CategoryId(3)).unwrap();
        assert_eq!(grandchild.level(), 1);
        assert_eq!(grandchild.path(), "/child/grandchild");
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_set_code_cascades_paths_only() {
        let mut tree = chain();
        tree.set_code(CategoryId(2), "alpha").unwrap();

        let c = tree.get(CategoryId(4)).unwrap();
        assert_eq!(c.path(), "/root/alpha/b/c");
        assert_eq!(c.level(), 3);
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_ancestor_queries() {
        let tree = chain();
        assert!(tree.is_ancestor_of(CategoryId(1), CategoryId(4)));
        assert!(tree.is_descendant_of(CategoryId(4), CategoryId(2)));
        assert!(!tree.is_descendant_of(CategoryId(2), CategoryId(4)));
        assert!(!tree.is_ancestor_of(CategoryId(4), CategoryId(4)));

        let ancestors: Vec<CategoryId> =
            tree.ancestors(CategoryId(4)).iter().map(|c| c.id).collect();
        assert_eq!(ancestors, vec![CategoryId(1), CategoryId(2), CategoryId(3)]);

        let full: Vec<&str> = tree.full_path(CategoryId(3)).iter().map(|c| c.code()).collect();
        assert_eq!(full, vec!["root", "a", "b"]);
    }

    #[test]
    fn test_children_ordered_by_sort_order_then_name() {
        let mut tree = CategoryTree::new();
        tree.insert(category(1, "root"), None).unwrap();

        let mut zeta = Category::new(CategoryId(2), "Zeta", "zeta").unwrap();
        zeta.sort_order = 0;
        let mut alpha = Category::new(CategoryId(3), "Alpha", "alpha").unwrap();
        alpha.sort_order = 0;
        let mut first = Category::new(CategoryId(4), "Omega", "omega").unwrap();
        first.sort_order = -1;

        tree.insert(zeta, Some(CategoryId(1))).unwrap();
        tree.insert(alpha, Some(CategoryId(1))).unwrap();
        tree.insert(first, Some(CategoryId(1))).unwrap();

        let names: Vec<&str> = tree
            .children_of(CategoryId(1))
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Omega", "Alpha", "Zeta"]);
    }

    #[test]
    fn test_remove_requires_leaf() {
        let mut tree = chain();
        let err = tree.remove(CategoryId(3)).unwrap_err();
        assert_eq!(
            err,
            HierarchyError::HasChildren {
                id: CategoryId(3),
                count: 1
            }
        );
        assert!(tree.remove(CategoryId(4)).is_ok());
        assert!(tree.remove(CategoryId(3)).is_ok());
    }

    #[test]
    fn test_nested_projection_hides_invalid_subtrees() {
        let mut tree = chain();
        tree.insert(category(5, "other"), None).unwrap();
        tree.get_mut(CategoryId(3)).unwrap().valid = false;

        let all = tree.nested(false);
        assert_eq!(all.len(), 2);

        let visible = tree.nested(true);
        let root = visible
            .iter()
            .find(|n| n.category.id == CategoryId(1))
            .unwrap();
        assert_eq!(root.category.id, CategoryId(1));
        assert_eq!(root.children.len(), 1);
        assert!(root.children[0].children.is_empty());
    }

    #[test]
    fn test_descendants_preorder() {
        let mut tree = chain();
        tree.insert(category(5, "a2"), Some(CategoryId(1))).unwrap();
        assert_eq!(
            tree.descendants_of(CategoryId(1)),
            vec![CategoryId(2), CategoryId(3), CategoryId(4), CategoryId(5)]
        );
    }

    #[test]
    fn test_recompute_terminates_on_stored_cycle() {
        let mut a = category(1, "a");
        let mut b = category(2, "b");
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);
        let mut tree = CategoryTree::from_categories([a, b]);

        let touched = tree.set_code(CategoryId(1), "x").unwrap();
        assert_eq!(touched, vec![CategoryId(1), CategoryId(2)]);
        assert!(!tree.is_consistent());
    }
}
