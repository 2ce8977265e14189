//! Taskweave - CLI entry point

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use taskweave::cli::{Cli, Command};
use taskweave::config::Config;
use taskweave::events::NullSink;
use taskweave::executor::TaskExecutor;
use taskweave::planner::{Planner, extract_task_title};
use taskweave::recovery::RecoveryManager;
use taskweave::supervisor::ExecutorSupervisor;
use taskweave::tools::ToolRegistry;
use taskweave::tree::TaskNode;
use taskweave::{llm, storage};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskweave")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("taskweave.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "Loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    match cli.command {
        Command::Run { description } => cmd_run(&config, &description).await,
        Command::Resume { folder } => cmd_resume(&config, &folder).await,
        Command::Recoverable => cmd_recoverable(&config),
    }
}

fn build_planner(config: &Config) -> Result<Planner> {
    let tools = Arc::new(ToolRegistry::standard());
    let llm = llm::create_client(&config.llm, tools.clone()).context("Failed to create LLM client")?;
    Ok(Planner::new(llm, tools))
}

/// Run a task from a natural-language description
async fn cmd_run(config: &Config, description: &str) -> Result<()> {
    let planner = build_planner(config)?;

    let title = extract_task_title(description);
    let root = TaskNode::new_root_with_goal(title, description, "Complete the user's request");

    println!("Starting task: {}", root.title);

    let executor = TaskExecutor::new(
        root.clone(),
        planner,
        config.execution.clone(),
        config.output_dir.clone(),
        Arc::new(NullSink),
    );

    let supervisor = ExecutorSupervisor::new();
    supervisor.register(executor.clone());
    let outcome = executor.execute().await;
    supervisor.unregister(&root.id);

    outcome?;

    if let Some(result) = root.result() {
        println!("\nResult:\n{}", result.summary);
        if !result.success {
            println!("\n(the result did not pass verification)");
        }
    }
    println!("\nOutput folder: {}", config.output_dir.join(executor.task_folder()).display());

    Ok(())
}

/// Resume an interrupted task from its checkpoint
async fn cmd_resume(config: &Config, folder: &str) -> Result<()> {
    let manager = RecoveryManager::new(config.output_dir.clone());

    let task_folder = if config.output_dir.join(folder).is_dir() {
        folder.to_string()
    } else {
        storage::find_task_folder_by_prefix(&config.output_dir, folder)?
    };

    let planner = build_planner(config)?;
    let (root, executor) =
        manager.recover_task(&task_folder, planner, config.execution.clone(), Arc::new(NullSink))?;

    println!("Resuming task: {} ({})", root.title, task_folder);

    let supervisor = ExecutorSupervisor::new();
    supervisor.register(executor.clone());
    let outcome = executor.execute().await;
    supervisor.unregister(&root.id);

    outcome?;

    if let Some(result) = root.result() {
        println!("\nResult:\n{}", result.summary);
    }

    Ok(())
}

/// List tasks with a recoverable checkpoint
fn cmd_recoverable(config: &Config) -> Result<()> {
    let manager = RecoveryManager::new(config.output_dir.clone());
    let tasks = manager.find_recoverable_tasks()?;

    if tasks.is_empty() {
        println!("No recoverable tasks.");
        return Ok(());
    }

    println!("Recoverable tasks:");
    for task in tasks {
        println!("  {}  [{}]  {}", task.task_folder, task.status, task.title);
    }
    println!("\nResume with: taskweave resume <folder>");

    Ok(())
}
