// src/eval/tasks.rs — Batch task loading, running, and CSV result sink
//
// Task rows come from CSV with user-friendly list fields: JSON arrays or
// '|'/','-separated text. The prompt field is never split on delimiters —
// prompt text legitimately contains commas and pipes.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;

use super::{run_evaluation, EvaluationResult, EvaluationTask, ResultRow};
use crate::infra::config::Credentials;
use crate::infra::errors::CitemeterError;

/// Tabular sinks choke on oversized cells; anything longer is cut and marked.
const MAX_CELL_LEN: usize = 45_000;

/// Run tasks in order, one result per task. The first failure aborts the
/// whole batch.
pub async fn run_tasks(
    tasks: &[EvaluationTask],
    creds: &Credentials,
) -> Result<Vec<EvaluationResult>, CitemeterError> {
    let mut results = Vec::with_capacity(tasks.len());
    for (index, task) in tasks.iter().enumerate() {
        tracing::info!(
            task = index,
            engines = ?task.engines,
            runs = task.runs,
            "Running evaluation task"
        );
        results.push(run_evaluation(task, creds).await?);
    }
    Ok(results)
}

pub fn load_tasks_from_csv(path: &Path) -> Result<Vec<EvaluationTask>, CitemeterError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows: Vec<HashMap<String, String>> = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    parse_task_rows(&rows)
}

pub fn parse_task_rows(
    rows: &[HashMap<String, String>],
) -> Result<Vec<EvaluationTask>, CitemeterError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            parse_task_row(row).map_err(|e| CitemeterError::Task {
                row: index,
                message: e.to_string(),
            })
        })
        .collect()
}

fn parse_task_row(row: &HashMap<String, String>) -> Result<EvaluationTask, CitemeterError> {
    let mut prompts = parse_prompt(row.get("prompt"));
    if prompts.is_empty() {
        // Older task sheets used a "prompts" column.
        prompts = parse_prompt(row.get("prompts"));
    }
    Ok(EvaluationTask {
        prompts,
        engines: parse_list(row.get("engines")),
        keywords: parse_list(row.get("keywords")),
        domain_wildcards: parse_list(row.get("domain_wildcards")),
        runs: parse_runs(row.get("runs"))?,
    })
}

/// Parse a list field: JSON array, else '|'-separated (preferred when
/// present), else ','-separated.
fn parse_list(value: Option<&String>) -> Vec<String> {
    let Some(text) = value else {
        return Vec::new();
    };
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(text) {
        return items.into_iter().map(json_item_to_string).collect();
    }
    let delimiter = if text.contains('|') { '|' } else { ',' };
    text.split(delimiter)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the prompt field: a JSON array yields multiple prompts; anything
/// else is one prompt, taken verbatim.
fn parse_prompt(value: Option<&String>) -> Vec<String> {
    let Some(text) = value else {
        return Vec::new();
    };
    if text.trim().is_empty() {
        return Vec::new();
    }
    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(text) {
        return items.into_iter().map(json_item_to_string).collect();
    }
    vec![text.clone()]
}

fn json_item_to_string(item: serde_json::Value) -> String {
    match item {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn parse_runs(value: Option<&String>) -> Result<u32, CitemeterError> {
    match value.map(|s| s.trim()) {
        None | Some("") => Ok(1),
        Some(text) => text
            .parse::<u32>()
            .map_err(|_| CitemeterError::Config(format!("invalid runs value '{text}'"))),
    }
}

/// Write all results to a fresh CSV file (header + one row per task).
pub fn write_results_to_csv(
    path: &Path,
    results: &[EvaluationResult],
) -> Result<(), CitemeterError> {
    if results.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    for result in results {
        writer.serialize(truncate_row(result.as_row()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Append one result row, writing the header only when creating the file.
pub fn append_result_to_csv(
    path: &Path,
    result: &EvaluationResult,
) -> Result<(), CitemeterError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let exists = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(!exists)
        .from_writer(file);
    writer.serialize(truncate_row(result.as_row()))?;
    writer.flush()?;
    Ok(())
}

fn truncate_row(mut row: ResultRow) -> ResultRow {
    row.prompts = truncate_cell(row.prompts);
    row.engines = truncate_cell(row.engines);
    row.keywords = truncate_cell(row.keywords);
    row.domain_wildcards = truncate_cell(row.domain_wildcards);
    row.keyword_counts = truncate_cell(row.keyword_counts);
    row.domain_counts = truncate_cell(row.domain_counts);
    row.raw_responses = truncate_cell(row.raw_responses);
    row
}

/// Cut an oversized cell at a UTF-8 boundary and mark the cut.
fn truncate_cell(text: String) -> String {
    if text.len() <= MAX_CELL_LEN {
        return text;
    }
    let mut end = MAX_CELL_LEN - 3;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
