//! Business Services
//!
//! This module contains the use-case layer of the question bank:
//!
//! - `CategoryService` - Category CRUD, re-parenting and tree projections
//! - `TagService` - Tag CRUD, find-or-create, merge and popularity ranking
//! - `QuestionService` - Question lifecycle with tag usage bookkeeping
//! - `QueryService` - Compiles `SearchCriteria` and executes paginated searches
//! - `QuestionBank` - Container wiring all services to one store and event channel
//!
//! Services load aggregates from a `QuestionBankStore`, mutate them through
//! model methods, commit one `ChangeSet` per use case and only then emit a
//! `DomainEvent`.

pub mod category_service;
pub mod config;
pub mod error;
pub mod query_service;
pub mod question_bank;
pub mod question_service;
pub mod tag_service;

pub use category_service::{CategoryService, CreateCategoryParams, UpdateCategoryParams};
pub use config::QuestionBankConfig;
pub use error::{ErrorKind, QuestionBankError, ServiceResult};
pub use query_service::{build_predicates, QueryService};
pub use question_bank::QuestionBank;
pub use question_service::{OptionParams, QuestionParams, QuestionService};
pub use tag_service::{CreateTagParams, TagService, UpdateTagParams};
