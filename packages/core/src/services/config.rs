//! Service configuration
//!
//! Tunables for the question bank services. Hard invariants (difficulty
//! range, page size ceiling, title length) are constants in `models`.

use crate::models::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use serde::{Deserialize, Serialize};

/// Default domain event channel capacity
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Default number of tags returned by popularity ranking
pub const DEFAULT_POPULAR_TAGS_LIMIT: usize = 10;

/// Configuration for [`QuestionBank`](crate::QuestionBank)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionBankConfig {
    /// Page size used when a search does not specify one (default: 20)
    pub default_page_limit: u32,
    /// Buffered domain events per subscriber before lagging (default: 1000)
    pub event_channel_capacity: usize,
    /// Tags returned by `find_popular` without an explicit limit (default: 10)
    pub popular_tags_limit: usize,
}

impl Default for QuestionBankConfig {
    fn default() -> Self {
        Self {
            default_page_limit: DEFAULT_PAGE_LIMIT,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            popular_tags_limit: DEFAULT_POPULAR_TAGS_LIMIT,
        }
    }
}

impl QuestionBankConfig {
    /// Read overrides from `QUIZBANK_*` environment variables
    ///
    /// Missing or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_page_limit: env_or("QUIZBANK_DEFAULT_PAGE_LIMIT", defaults.default_page_limit)
                .clamp(1, MAX_PAGE_LIMIT),
            event_channel_capacity: env_or(
                "QUIZBANK_EVENT_CHANNEL_CAPACITY",
                defaults.event_channel_capacity,
            )
            .max(1),
            popular_tags_limit: env_or("QUIZBANK_POPULAR_TAGS_LIMIT", defaults.popular_tags_limit),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
