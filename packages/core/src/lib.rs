//! QuizBank Core Business Logic Layer
//!
//! This crate provides the domain model, storage abstraction and services
//! for a quiz question bank: questions organized in a category tree, tagged
//! with a usage-counted folksonomy and searchable through composable criteria.
//!
//! # Architecture
//!
//! - **Aggregates enforce invariants**: category level/path caching, option
//!   rules per question type and the draft/published/archived lifecycle live
//!   on the models
//! - **One commit per use case**: services stage every change in a
//!   `ChangeSet` and the store applies it atomically with version checks
//! - **Events after commit**: subscribers see a `DomainEvent` only for
//!   changes that were persisted
//!
//! # Modules
//!
//! - [`models`] - Domain types (Category, Tag, Question, SearchCriteria, etc.)
//! - [`services`] - Use cases (CategoryService, TagService, QuestionService, QueryService)
//! - [`db`] - Storage trait, change sets, in-memory store and domain events

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use services::*;
