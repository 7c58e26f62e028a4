//! Storage Layer
//!
//! This module defines how the question bank persists its aggregates:
//!
//! - `QuestionBankStore` - async trait every backend implements
//! - `ChangeSet` - atomic batch of writes with optimistic version checks
//! - `InMemoryStore` - process-local backend used by tests, tools and embedding apps
//! - `DomainEvent` - notifications broadcast after a successful commit
//!
//! # Architecture
//!
//! Services load aggregates, mutate them through model methods, collect the
//! results in a single `ChangeSet` and commit it. The store enforces the
//! invariants that span rows: version checks, unique category codes and
//! unique tag slugs.

mod error;
pub mod events;
mod memory_store;
mod store;

pub use error::{StoreError, StoreResult};
pub use events::DomainEvent;
pub use memory_store::InMemoryStore;
pub use store::{ChangeSet, ChangeSetParts, QueryPage, QuestionBankStore};
