// src/cli/batch.rs — Batch command: one evaluation per task CSV row

use std::path::Path;

use crate::eval::tasks::{load_tasks_from_csv, run_tasks, write_results_to_csv};
use crate::infra::config::Credentials;

pub async fn run_batch(task_file: &Path, output_file: &Path) -> anyhow::Result<()> {
    let creds = Credentials::from_env();

    let tasks = load_tasks_from_csv(task_file)?;
    if tasks.is_empty() {
        anyhow::bail!("Task file '{}' contains no tasks", task_file.display());
    }
    tracing::info!(tasks = tasks.len(), "Loaded task file");

    let results = run_tasks(&tasks, &creds).await?;
    write_results_to_csv(output_file, &results)?;

    let payload: Vec<serde_json::Value> = results.iter().map(|r| r.as_json()).collect();
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
