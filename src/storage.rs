//! Task persistence: checkpoints, execution logs, and the output index.
//!
//! Layout per run, under the configured output directory:
//!
//! ```text
//! <output-dir>/<task-folder>/
//!   doc/...                  artefacts written by tools, one dir per node
//!   logs/checkpoint.json     full tree snapshot, deleted on completion
//!   logs/execution.json      full tree snapshot, written once at the end
//!   logs/summary.txt         short human-readable summary
//!   README.md                index of the produced documents
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use eyre::{Context, Result};

use crate::tree::{NodeSnapshot, NodeStatus};

/// Subdirectory for checkpoint and log files
pub const LOG_SUBDIR: &str = "logs";

/// Subdirectory for tool-produced documents
pub const DOC_SUBDIR: &str = "doc";

/// Checkpoint file name
pub const CHECKPOINT_FILE: &str = "checkpoint.json";

/// Execution log file name
pub const EXECUTION_LOG_FILE: &str = "execution.json";

/// Replace characters that are unsafe in file and directory names
pub fn sanitize_for_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            other => other,
        })
        .collect();
    sanitized.chars().take(30).collect()
}

/// Task folder name for a fresh run: sanitised title + timestamp
pub fn task_folder_name(title: &str) -> String {
    format!("{}_{}", sanitize_for_filename(title), Local::now().format("%Y%m%d_%H%M%S"))
}

/// Path of the checkpoint file for a task folder
pub fn checkpoint_path(output_dir: &Path, task_folder: &str) -> PathBuf {
    output_dir.join(task_folder).join(LOG_SUBDIR).join(CHECKPOINT_FILE)
}

/// Path of the final execution log for a task folder
pub fn execution_log_path(output_dir: &Path, task_folder: &str) -> PathBuf {
    output_dir.join(task_folder).join(LOG_SUBDIR).join(EXECUTION_LOG_FILE)
}

/// Write a JSON value atomically: temp file in the same directory, then
/// rename over the target.
fn write_json_atomic(path: &Path, snapshot: &NodeSnapshot) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| eyre::eyre!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent).context("Failed to create log directory")?;

    let data = serde_json::to_vec_pretty(snapshot).context("Failed to serialise tree snapshot")?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &data).context("Failed to write temp file")?;
    fs::rename(&tmp, path).context("Failed to rename temp file into place")?;
    Ok(())
}

/// Persist a checkpoint of the tree
pub fn save_checkpoint(snapshot: &NodeSnapshot, output_dir: &Path, task_folder: &str) -> Result<PathBuf> {
    let path = checkpoint_path(output_dir, task_folder);
    write_json_atomic(&path, snapshot)?;
    Ok(path)
}

/// Load a checkpoint from disk
pub fn load_checkpoint(path: &Path) -> Result<NodeSnapshot> {
    let data = fs::read_to_string(path).context("Failed to read checkpoint file")?;
    serde_json::from_str(&data).context("Failed to parse checkpoint file")
}

/// Persist the final execution log (same payload as a checkpoint) plus a
/// short plain-text summary.
pub fn save_execution_log(snapshot: &NodeSnapshot, output_dir: &Path, task_folder: &str) -> Result<PathBuf> {
    let path = execution_log_path(output_dir, task_folder);
    write_json_atomic(&path, snapshot)?;

    let summary_path = path.with_file_name("summary.txt");
    if let Err(e) = fs::write(&summary_path, build_summary(snapshot)) {
        tracing::warn!("failed to write summary: {}", e);
    }

    Ok(path)
}

/// Remove the checkpoint file for a task folder; idempotent
pub fn remove_checkpoint(output_dir: &Path, task_folder: &str) -> Result<()> {
    let path = checkpoint_path(output_dir, task_folder);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("Failed to remove checkpoint file"),
    }
}

/// Short human-readable run summary
fn build_summary(snapshot: &NodeSnapshot) -> String {
    let status = match &snapshot.result {
        Some(result) if result.success => "succeeded",
        _ => "failed",
    };

    let mut out = format!("Task: {}\n", snapshot.title);
    out.push_str(&format!("Status: {}\n", status));
    out.push_str(&format!("Started: {}\n", snapshot.created_at.format("%Y-%m-%d %H:%M:%S")));
    if let Some(finished) = snapshot.finished_at {
        out.push_str(&format!("Finished: {}\n", finished.format("%Y-%m-%d %H:%M:%S")));
    }
    out.push_str(&format!("Sub-tasks: {}\n", snapshot.children.len()));

    if let Some(result) = &snapshot.result {
        if !result.summary.is_empty() {
            out.push_str(&format!("\nResult summary:\n{}\n", result.summary));
        }
    }

    out
}

/// Render the README.md index next to the run's documents
pub fn write_readme(snapshot: &NodeSnapshot, task_dir: &Path) -> Result<PathBuf> {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", snapshot.title));
    out.push_str(&format!("> Generated {}\n\n", Local::now().format("%Y-%m-%d %H:%M")));

    out.push_str("## Task tree\n\n```\n");
    render_tree(&mut out, snapshot, 0);
    out.push_str("```\n\n");

    out.push_str("## Documents\n\n");
    let doc_dir = task_dir.join(DOC_SUBDIR);
    let files = collect_files(&doc_dir, &doc_dir);
    if files.is_empty() {
        out.push_str("*no documents produced*\n\n");
    } else {
        for file in &files {
            out.push_str(&format!("- [{}]({}/{})\n", file, DOC_SUBDIR, file));
        }
        out.push('\n');
    }

    if let Some(result) = &snapshot.result {
        if !result.summary.is_empty() {
            out.push_str("## Result\n\n");
            out.push_str(&result.summary);
            out.push('\n');
        }
    }

    let readme_path = task_dir.join("README.md");
    fs::create_dir_all(task_dir).context("Failed to create task directory")?;
    fs::write(&readme_path, out).context("Failed to write README")?;
    Ok(readme_path)
}

fn render_tree(out: &mut String, node: &NodeSnapshot, depth: usize) {
    let marker = match node.status {
        NodeStatus::Done => "[x]",
        NodeStatus::Failed => "[!]",
        NodeStatus::Canceled => "[-]",
        _ => "[ ]",
    };
    out.push_str(&format!("{}{} {}\n", "  ".repeat(depth), marker, node.title));
    for child in &node.children {
        render_tree(out, child, depth + 1);
    }
}

/// Relative paths of all files beneath a directory, sorted
fn collect_files(root: &Path, dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_files(root, &path));
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_string_lossy().into_owned());
        }
    }
    files.sort();
    files
}

/// Find the first task folder whose name starts with the given prefix
pub fn find_task_folder_by_prefix(output_dir: &Path, prefix: &str) -> Result<String> {
    let entries = fs::read_dir(output_dir).context("Failed to read output directory")?;

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() && name.starts_with(prefix) {
            return Ok(name);
        }
    }

    Err(eyre::eyre!("no task folder matching prefix: {}", prefix))
}
