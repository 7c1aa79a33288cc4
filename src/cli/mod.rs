// src/cli/mod.rs — CLI definition (clap derive)

pub mod batch;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "citemeter",
    about = "Measure keyword frequency and citation-domain coverage across LLM engines",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a single evaluation
    Run {
        /// Prompt to test. Repeat for multiple prompts.
        #[arg(long = "prompt", required = true)]
        prompts: Vec<String>,

        /// Engine in '<provider>/<model>' format. Repeat for more.
        #[arg(long = "engine", required = true)]
        engines: Vec<String>,

        /// Keyword to count in responses. Repeat for more.
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Domain wildcard matched against citations (e.g. '*.example.com').
        #[arg(long = "domain")]
        domains: Vec<String>,

        /// Number of iterations to average.
        #[arg(long, default_value_t = 1)]
        runs: u32,

        /// Optional path to append the result row as CSV.
        #[arg(long)]
        output_csv: Option<PathBuf>,
    },

    /// Run one evaluation per row of a task CSV
    Batch {
        /// CSV file with task parameters.
        #[arg(long)]
        task_file: PathBuf,

        /// CSV file to write aggregated results.
        #[arg(long)]
        output_file: PathBuf,
    },
}
