//! Tag model
//!
//! Tags are a flat folksonomy attached to questions many-to-many. A tag's
//! `usage_count` mirrors how many questions reference it; it can only move
//! through [`Question::attach_tag`](super::Question::attach_tag) and
//! [`Question::detach_tag`](super::Question::detach_tag), so the counter
//! cannot drift from actual membership.

use super::validation::check_text;
use super::{TagId, ValidationError};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const MAX_TAG_NAME_LENGTH: usize = 50;

static COLOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());
static SLUG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());
static SLUG_STRIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Derive a URL-safe slug from a tag name
///
/// Lower-cases, drops everything outside `[a-z0-9\s-]`, turns each run of
/// whitespace into `-` and trims leading/trailing dashes.
///
/// ```rust
/// use quizbank_core::models::slugify;
///
/// assert_eq!(slugify("  Rust & WebAssembly "), "rust-webassembly");
/// ```
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lowered, "");
    let dashed = WHITESPACE.replace_all(stripped.trim(), "-");
    dashed.trim_matches('-').to_string()
}

/// Tag entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    name: String,
    slug: String,
    pub description: Option<String>,
    color: Option<String>,
    #[serde(default)]
    usage_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl Tag {
    /// Create an unused tag; the slug is derived from `name` when absent
    pub fn new(
        id: TagId,
        name: impl Into<String>,
        slug: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let mut errors = ValidationError::new();
        check_text(&mut errors, "name", &name, Some(MAX_TAG_NAME_LENGTH));
        errors.into_result()?;

        let slug = Self::resolve_slug(&name, slug)?;
        let now = Utc::now();
        Ok(Self {
            id,
            name,
            slug,
            description: None,
            color: None,
            usage_count: 0,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Use the explicit slug if given (validated), otherwise derive one from `name`
    pub fn resolve_slug(name: &str, slug: Option<String>) -> Result<String, ValidationError> {
        let slug = match slug {
            Some(explicit) if !explicit.trim().is_empty() => explicit.trim().to_string(),
            _ => slugify(name),
        };
        if slug.is_empty() {
            return Err(ValidationError::single(
                "slug",
                "could not derive a slug; name needs at least one letter or digit",
            ));
        }
        if !SLUG_PATTERN.is_match(&slug) {
            return Err(ValidationError::single(
                "slug",
                "may only contain lowercase letters, digits and '-'",
            ));
        }
        Ok(slug)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    pub fn is_in_use(&self) -> bool {
        self.usage_count > 0
    }

    /// Rename and re-slug in one step
    pub fn rename(
        &mut self,
        name: impl Into<String>,
        slug: Option<String>,
    ) -> Result<(), ValidationError> {
        let name = name.into();
        let mut errors = ValidationError::new();
        check_text(&mut errors, "name", &name, Some(MAX_TAG_NAME_LENGTH));
        errors.into_result()?;

        self.slug = Self::resolve_slug(&name, slug)?;
        self.name = name;
        Ok(())
    }

    /// Set or clear the display color (`#RRGGBB`)
    pub fn set_color(&mut self, color: Option<String>) -> Result<(), ValidationError> {
        if let Some(value) = &color {
            if !COLOR_PATTERN.is_match(value) {
                return Err(ValidationError::single(
                    "color",
                    format!("must be a hex color like #1A2B3C (got '{}')", value),
                ));
            }
        }
        self.color = color;
        Ok(())
    }

    pub(super) fn increment_usage(&mut self) {
        self.usage_count = self.usage_count.saturating_add(1);
    }

    /// Floored at zero
    pub(super) fn decrement_usage(&mut self) {
        self.usage_count = self.usage_count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Rust Programming"), "rust-programming");
        assert_eq!(slugify("C++ / Systems"), "c-systems");
        assert_eq!(slugify("--Already-Dashed--"), "already-dashed");
        assert_eq!(slugify("Multi   Space\tTab"), "multi-space-tab");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_new_tag_derives_slug() {
        let tag = Tag::new(TagId(1), "Data Structures", None).unwrap();
        assert_eq!(tag.slug(), "data-structures");
        assert_eq!(tag.usage_count(), 0);

        let explicit = Tag::new(TagId(2), "Data Structures", Some("ds".to_string())).unwrap();
        assert_eq!(explicit.slug(), "ds");
    }

    #[test]
    fn test_invalid_slugs_rejected() {
        assert!(Tag::new(TagId(1), "???", None).is_err());
        assert!(Tag::new(TagId(1), "Ok", Some("Not Valid".to_string())).is_err());
        assert!(Tag::new(TagId(1), "  ", None).is_err());
    }

    #[test]
    fn test_color_validation() {
        let mut tag = Tag::new(TagId(1), "Rust", None).unwrap();
        assert!(tag.set_color(Some("#a1B2c3".to_string())).is_ok());
        assert_eq!(tag.color(), Some("#a1B2c3"));

        let err = tag.set_color(Some("red".to_string())).unwrap_err();
        assert!(err.has_field("color"));
        assert_eq!(tag.color(), Some("#a1B2c3"));

        assert!(tag.set_color(Some("#12345".to_string())).is_err());
        assert!(tag.set_color(None).is_ok());
        assert_eq!(tag.color(), None);
    }

    #[test]
    fn test_usage_floor_at_zero() {
        let mut tag = Tag::new(TagId(1), "Rust", None).unwrap();
        tag.increment_usage();
        tag.decrement_usage();
        tag.decrement_usage();
        assert_eq!(tag.usage_count(), 0);
    }
}
