// src/main.rs — citemeter entry point

use clap::Parser;

use citemeter::cli::{Cli, Commands};
use citemeter::infra::logger;

#[tokio::main]
async fn main() {
    // Respects RUST_LOG when set
    logger::init("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            prompts,
            engines,
            keywords,
            domains,
            runs,
            output_csv,
        } => {
            citemeter::cli::run::run_single(
                prompts,
                engines,
                keywords,
                domains,
                runs,
                output_csv.as_deref(),
            )
            .await
        }
        Commands::Batch {
            task_file,
            output_file,
        } => citemeter::cli::batch::run_batch(&task_file, &output_file).await,
    }
}
