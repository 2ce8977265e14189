//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Taskweave - hierarchical LLM task orchestrator
#[derive(Parser)]
#[command(name = "taskweave", about = "Hierarchical LLM task orchestrator with checkpoint recovery", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run a task described in natural language
    Run {
        /// Task description
        description: String,
    },

    /// Resume an interrupted task from its checkpoint
    Resume {
        /// Task folder name, or a unique prefix of it
        folder: String,
    },

    /// List tasks that can be resumed
    Recoverable,
}
