use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hrflow::adapter::{AdapterRegistry, NoopAdapter};
use hrflow::engine::WorkflowEngine;
use hrflow::workflow::{DefinitionLoader, ExecutionStatus, StepOutcome, WorkflowStatus};

#[derive(Parser)]
#[command(name = "hrflow")]
#[command(about = "Run HR workflow definitions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single workflow definition file
    Run {
        /// Path to the workflow YAML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Initial execution context as a JSON object
        #[arg(short, long, default_value = "{}")]
        context: String,

        /// Actor recorded as the manual trigger source
        #[arg(short, long, default_value = "cli")]
        actor: String,
    },

    /// List workflow definitions in a directory
    List {
        /// Path to the definitions directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Validate definition files without running them
    Validate {
        /// Path to a definition file or directory
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "hrflow=debug" } else { "hrflow=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run {
            file,
            context,
            actor,
        } => run_single(file, &context, &actor).await,
        Commands::List { dir } => list_definitions(dir).await,
        Commands::Validate { path } => validate(path).await,
    }
}

async fn run_single(file: PathBuf, context: &str, actor: &str) -> anyhow::Result<bool> {
    if !file.exists() {
        anyhow::bail!("Workflow file not found: {}", file.display());
    }

    let context: serde_json::Value = serde_json::from_str(context)?;
    let definition = DefinitionLoader::load_file(&file)?;

    println!("Running workflow: {}\n", definition.name);

    let registry = AdapterRegistry::new().with_fallback(Arc::new(NoopAdapter));
    let engine = WorkflowEngine::in_memory(registry);

    let workflow = engine.create_workflow(&definition, actor).await?;
    engine.set_status(workflow.id, WorkflowStatus::Active).await?;

    let execution_id = engine.trigger_manual(workflow.id, context, actor).await?;
    let execution = engine.await_terminal(execution_id).await?;
    let logs = engine.step_logs(execution_id).await?;

    println!("=== Execution Result ===\n");
    println!(
        "Status: {}",
        match execution.status {
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Running => "RUNNING",
        }
    );
    if let Some(error) = &execution.error {
        println!("Error: {}", error);
    }
    println!("Execution ID: {}\n", execution.id);

    for log in &logs {
        let status = match log.outcome {
            StepOutcome::Success => "✓",
            StepOutcome::Failure => "✗",
        };
        println!("  {} {} (attempt {})", status, log.step_name, log.attempt);
        if let Some(err) = &log.error {
            println!("      Error: {}", err);
        }
    }

    println!(
        "\nFinal context: {}",
        serde_json::to_string_pretty(&serde_json::Value::Object(execution.context.clone()))?
    );

    Ok(execution.status == ExecutionStatus::Completed)
}

async fn list_definitions(dir: PathBuf) -> anyhow::Result<bool> {
    if !dir.exists() {
        anyhow::bail!("Directory not found: {}", dir.display());
    }

    let definitions = DefinitionLoader::load_directory(&dir)?;

    if definitions.is_empty() {
        println!("No workflow definitions found in: {}", dir.display());
        return Ok(true);
    }

    println!("Workflow definitions in {}:\n", dir.display());
    for definition in &definitions {
        println!(
            "  {} ({:?}, trigger: {:?}, {} steps)",
            definition.name,
            definition.domain,
            definition.trigger,
            definition.steps.len()
        );
    }

    Ok(true)
}

async fn validate(path: PathBuf) -> anyhow::Result<bool> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }

    if path.is_dir() {
        let definitions = DefinitionLoader::load_directory(&path)?;
        if definitions.is_empty() {
            println!("No workflow definitions found in: {}", path.display());
            return Ok(true);
        }

        for definition in &definitions {
            definition.validate()?;
        }
        println!("✓ {} definitions validated", definitions.len());
    } else {
        let definition = DefinitionLoader::load_file(&path)?;
        definition.validate()?;
        println!("✓ {} is valid", path.display());
    }

    Ok(true)
}
