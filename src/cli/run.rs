// src/cli/run.rs — Single evaluation command

use std::path::Path;

use crate::eval::tasks::append_result_to_csv;
use crate::eval::{run_evaluation, EvaluationTask};
use crate::infra::config::Credentials;

pub async fn run_single(
    prompts: Vec<String>,
    engines: Vec<String>,
    keywords: Vec<String>,
    domain_wildcards: Vec<String>,
    runs: u32,
    output_csv: Option<&Path>,
) -> anyhow::Result<()> {
    let creds = Credentials::from_env();
    let task = EvaluationTask {
        prompts,
        engines,
        keywords,
        domain_wildcards,
        runs,
    };

    let result = run_evaluation(&task, &creds).await?;

    if let Some(path) = output_csv {
        append_result_to_csv(path, &result)?;
    }

    println!("{}", serde_json::to_string_pretty(&result.as_json())?);
    Ok(())
}
