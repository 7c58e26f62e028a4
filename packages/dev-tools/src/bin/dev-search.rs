//! Development Search Runner
//!
//! Loads a JSON dataset into an in-memory question bank and runs one search
//! against it, printing the paginated result as JSON. Useful for checking
//! filter and ordering behavior without wiring up an application.
//!
//! # Dataset format
//!
//! Categories and tags are referenced by code and name, so a dataset can be
//! written by hand:
//!
//! ```json
//! {
//!   "categories": [
//!     { "name": "Programming", "code": "prog" },
//!     { "name": "PHP", "code": "php", "parent": "prog" }
//!   ],
//!   "tags": ["Basics", "Arrays"],
//!   "questions": [
//!     {
//!       "title": "PHP Programming",
//!       "content": "Which function counts array elements?",
//!       "type": "single_choice",
//!       "categories": ["php"],
//!       "tags": ["Arrays"],
//!       "publish": true,
//!       "options": [
//!         { "content": "count()", "isCorrect": true },
//!         { "content": "size()" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin dev-search -- dataset.json '{"keyword": "Programming"}'
//! cargo run --bin dev-search -- dataset.json criteria.json
//! ```
//!
//! Defaults come from `QUIZBANK_*` environment variables; log verbosity from
//! `RUST_LOG` (default `info`).

use anyhow::{anyhow, Context};
use quizbank_core::models::{CategoryId, SearchCriteria};
use quizbank_core::services::{
    CreateCategoryParams, QuestionBank, QuestionBankConfig, QuestionParams,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Dataset {
    #[serde(default)]
    categories: Vec<SeedCategory>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    questions: Vec<SeedQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedCategory {
    name: String,
    code: String,
    /// Parent category code; must appear earlier in the list
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    sort_order: i32,
}

#[derive(Debug, Deserialize)]
struct SeedQuestion {
    #[serde(flatten)]
    params: QuestionParams,
    /// Category codes
    #[serde(default)]
    categories: Vec<String>,
    /// Tag names; unknown names are created
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    publish: bool,
}

async fn load_dataset(bank: &QuestionBank, dataset: Dataset) -> anyhow::Result<()> {
    let mut categories: HashMap<String, CategoryId> = HashMap::new();
    for seed in dataset.categories {
        let mut params = CreateCategoryParams::new(seed.name, seed.code.clone())
            .with_sort_order(seed.sort_order);
        if let Some(parent) = &seed.parent {
            let parent_id = categories
                .get(parent)
                .copied()
                .ok_or_else(|| anyhow!("Category '{}' references unknown parent '{}'", seed.code, parent))?;
            params = params.with_parent(parent_id);
        }
        let category = bank.categories().create(params).await?;
        categories.insert(seed.code, category.id);
    }

    for name in &dataset.tags {
        bank.tags().find_or_create(name).await?;
    }

    for seed in dataset.questions {
        let mut params = seed.params;
        for code in &seed.categories {
            let id = categories
                .get(code)
                .copied()
                .ok_or_else(|| anyhow!("Question '{}' references unknown category '{}'", params.title, code))?;
            params.category_ids.push(id);
        }
        for name in &seed.tags {
            let tag = bank.tags().find_or_create(name).await?;
            params.tag_ids.push(tag.id);
        }
        dedup(&mut params.category_ids);
        dedup(&mut params.tag_ids);

        let title = params.title.clone();
        let question = bank
            .questions()
            .create(params)
            .await
            .with_context(|| format!("Failed to create question '{}'", title))?;
        if seed.publish {
            bank.questions().publish(question.id).await?;
        }
    }

    Ok(())
}

fn dedup<T: Ord>(ids: &mut Vec<T>) {
    ids.sort();
    ids.dedup();
}

/// Criteria from a JSON file path, or from the argument itself as inline JSON
fn load_criteria(arg: &str) -> anyhow::Result<SearchCriteria> {
    let raw = if Path::new(arg).is_file() {
        std::fs::read_to_string(arg).with_context(|| format!("Failed to read criteria {}", arg))?
    } else {
        arg.to_string()
    };
    serde_json::from_str(&raw).context("Invalid search criteria JSON")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let dataset_path = args
        .next()
        .ok_or_else(|| anyhow!("usage: dev-search <dataset.json> [criteria.json | criteria-json]"))?;
    let criteria = match args.next() {
        Some(arg) => load_criteria(&arg)?,
        None => SearchCriteria::default(),
    };

    let raw = std::fs::read_to_string(&dataset_path)
        .with_context(|| format!("Failed to read dataset {}", dataset_path))?;
    let dataset: Dataset = serde_json::from_str(&raw).context("Invalid dataset JSON")?;

    let bank = QuestionBank::in_memory(QuestionBankConfig::from_env());
    load_dataset(&bank, dataset).await?;
    tracing::info!("Loaded dataset from {}", dataset_path);

    let result = bank.questions().search(&criteria).await?;
    tracing::info!(
        "Search matched {} questions ({} pages)",
        result.total(),
        result.total_pages()
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
