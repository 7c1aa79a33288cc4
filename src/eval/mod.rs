// src/eval/mod.rs — Evaluation aggregator
//
// Runs a task's engines over its prompts for the requested number of runs,
// scores every response, and averages the totals per run. Fully sequential:
// each call completes (including its retry cycle) before the next begins,
// so raw records come out in strict (run, engine, prompt) order.

pub mod scoring;
pub mod tasks;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{resolver, Engine};
use crate::infra::config::Credentials;
use crate::infra::errors::CitemeterError;

/// One unit of evaluation work: which prompts to send to which engines,
/// what to count in the responses, and how many times to repeat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationTask {
    pub prompts: Vec<String>,
    pub engines: Vec<String>,
    pub keywords: Vec<String>,
    pub domain_wildcards: Vec<String>,
    pub runs: u32,
}

impl EvaluationTask {
    /// Input validation, performed before any network activity.
    pub fn validate(&self) -> Result<(), CitemeterError> {
        if self.runs < 1 {
            return Err(CitemeterError::Config("Runs must be at least 1".into()));
        }
        if self.prompts.is_empty() {
            return Err(CitemeterError::Config(
                "At least one prompt is required".into(),
            ));
        }
        if self.engines.is_empty() {
            return Err(CitemeterError::Config(
                "At least one engine is required".into(),
            ));
        }
        Ok(())
    }
}

/// Audit record for one (run, engine, prompt) call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub run: u32,
    pub prompt: String,
    pub engine: String,
    pub content: String,
    pub cites: Vec<String>,
    pub raw: serde_json::Value,
}

/// Aggregated outcome of one task. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub timestamp: DateTime<Utc>,
    pub prompts: Vec<String>,
    pub engines: Vec<String>,
    pub keywords: Vec<String>,
    pub domain_wildcards: Vec<String>,
    pub runs: u32,
    /// Average occurrences per run, keyed by keyword.
    pub keyword_counts: BTreeMap<String, f64>,
    /// Average matches per run, keyed by wildcard pattern.
    pub domain_counts: BTreeMap<String, f64>,
    pub raw_responses: Vec<RawRecord>,
}

/// Flattened row shape for tabular sinks: list and map fields JSON-encoded
/// into single text cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub timestamp: String,
    pub prompts: String,
    pub engines: String,
    pub keywords: String,
    pub domain_wildcards: String,
    pub runs: u32,
    pub keyword_counts: String,
    pub domain_counts: String,
    pub raw_responses: String,
}

impl EvaluationResult {
    pub fn as_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    pub fn as_row(&self) -> ResultRow {
        ResultRow {
            timestamp: self.timestamp.to_rfc3339(),
            prompts: json_cell(&self.prompts),
            engines: json_cell(&self.engines),
            keywords: json_cell(&self.keywords),
            domain_wildcards: json_cell(&self.domain_wildcards),
            runs: self.runs,
            keyword_counts: json_cell(&self.keyword_counts),
            domain_counts: json_cell(&self.domain_counts),
            raw_responses: json_cell(&self.raw_responses),
        }
    }
}

fn json_cell<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Resolve the task's engines and evaluate it.
pub async fn run_evaluation(
    task: &EvaluationTask,
    creds: &Credentials,
) -> Result<EvaluationResult, CitemeterError> {
    task.validate()?;
    let engines = resolver::resolve_all(&task.engines, creds)?;
    run_with_engines(task, &engines).await
}

/// Evaluate a task against already-resolved engines.
///
/// Iterates run (outer) → engine (middle) → prompt (inner); any engine
/// failure aborts the whole task, producing no partial result.
pub async fn run_with_engines(
    task: &EvaluationTask,
    engines: &[Arc<dyn Engine>],
) -> Result<EvaluationResult, CitemeterError> {
    task.validate()?;

    let mut keyword_totals: BTreeMap<String, u64> =
        task.keywords.iter().map(|kw| (kw.clone(), 0)).collect();
    let mut domain_totals: BTreeMap<String, u64> = task
        .domain_wildcards
        .iter()
        .map(|pattern| (pattern.clone(), 0))
        .collect();
    let mut raw_records: Vec<RawRecord> = Vec::new();

    for run_index in 0..task.runs {
        for engine in engines {
            for prompt in &task.prompts {
                tracing::debug!(
                    run = run_index,
                    engine = engine.name(),
                    "Evaluating prompt"
                );
                let response = engine.run(prompt).await?;

                for (kw, count) in scoring::count_keywords(&response.content, &task.keywords) {
                    *keyword_totals.entry(kw).or_insert(0) += count;
                }
                for (pattern, count) in
                    scoring::count_domains(&response.cites, &task.domain_wildcards)
                {
                    *domain_totals.entry(pattern).or_insert(0) += count;
                }

                raw_records.push(RawRecord {
                    run: run_index,
                    prompt: prompt.clone(),
                    engine: engine.name().to_string(),
                    content: response.content,
                    cites: response.cites,
                    raw: response.raw,
                });
            }
        }
    }

    // Average per run — totals include every engine×prompt combination, and
    // only the run count divides them.
    let runs = task.runs as f64;
    let keyword_counts = keyword_totals
        .into_iter()
        .map(|(kw, total)| (kw, total as f64 / runs))
        .collect();
    let domain_counts = domain_totals
        .into_iter()
        .map(|(pattern, total)| (pattern, total as f64 / runs))
        .collect();

    Ok(EvaluationResult {
        timestamp: Utc::now(),
        prompts: task.prompts.clone(),
        engines: task.engines.clone(),
        keywords: task.keywords.clone(),
        domain_wildcards: task.domain_wildcards.clone(),
        runs: task.runs,
        keyword_counts,
        domain_counts,
        raw_responses: raw_records,
    })
}
