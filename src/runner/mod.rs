//! Running a project workflow with the `nextflow` engine
//!
//! RAFT builds the engine command line, runs it in the project's `logs`
//! directory with the terminal attached, and post-processes a successful run:
//! reports move to `outputs/reports` and intermediate files in `work` are
//! accounted for (and optionally deleted).

pub mod clean;
pub mod history;
pub mod intermediates;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::context::RaftContext;
use crate::error::RaftError;
use crate::fs_ops;
use crate::project::{ProjectLayout, MAIN_WORKFLOW};
use crate::prompt;
use crate::subprocess::{ExitStatus, ProcessCommand, ProcessCommandBuilder};

pub use clean::{clean_project, CleanOptions, CleanReport};
pub use intermediates::IntermediateReport;

pub const NEXTFLOW: &str = "nextflow";

/// Report artifacts written to `logs` and relocated after a successful run
pub const REPORT_FILES: [(&str, &str); 4] = [
    ("-with-trace", "trace.txt"),
    ("-with-report", "report.html"),
    ("-with-dag", "dag.dot"),
    ("-with-timeline", "timeline.html"),
];

#[derive(Debug, Clone)]
pub struct RunWorkflowOptions {
    /// Entry point under `workflow/`, without `.nf`
    pub workflow: String,
    /// Extra engine arguments, shell-quoted
    pub nf_params: Option<String>,
    pub resume: bool,
    pub keep_previous_outputs: bool,
    pub reports: bool,
    pub keep_intermediates: bool,
    pub confirm_intermediates_deletion: bool,
    pub delete_suffixes: Vec<String>,
}

impl Default for RunWorkflowOptions {
    fn default() -> Self {
        Self {
            workflow: MAIN_WORKFLOW.to_string(),
            nf_params: None,
            resume: true,
            keep_previous_outputs: false,
            reports: true,
            keep_intermediates: false,
            confirm_intermediates_deletion: false,
            delete_suffixes: intermediates::DEFAULT_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub command: String,
    pub status: ExitStatus,
    pub moved_reports: Vec<PathBuf>,
    pub intermediates: Option<IntermediateReport>,
}

/// A configured directory passed to the engine, when the installation has one
fn optional_dir(ctx: &RaftContext, key: &str) -> Option<PathBuf> {
    ctx.config
        .filesystem
        .get(key)
        .map(|path| ctx.raft_dir.join(path))
}

/// The engine invocation for `options`, run from the project's `logs` directory
pub fn build_command(
    ctx: &RaftContext,
    layout: &ProjectLayout,
    options: &RunWorkflowOptions,
) -> Result<ProcessCommand> {
    let entry = layout.workflow_file(&options.workflow);
    if !entry.is_file() {
        return Err(RaftError::EntryPointNotFound { path: entry }.into());
    }

    let nf_params = match &options.nf_params {
        Some(params) => shell_words::split(params)
            .with_context(|| format!("Failed to parse engine parameters `{params}`"))?,
        None => Vec::new(),
    };

    let mut builder = ProcessCommandBuilder::new(NEXTFLOW)
        .arg("-Dnxf.pool.type=sync")
        .arg("run")
        .path_arg(&entry)
        .args(&nf_params)
        .arg("--project_dir")
        .path_arg(layout.root());

    if options.resume {
        builder = builder.arg("-resume");
    }
    if options.reports {
        for (flag, file) in REPORT_FILES {
            builder = builder.arg(flag).arg(file);
        }
    }
    builder = builder.arg("-w").path_arg(&layout.work_dir());
    if let Some(fastqs) = optional_dir(ctx, "fastqs") {
        builder = builder.arg("--global_fq_dir").path_arg(&fastqs);
    }
    if let Some(shared) = optional_dir(ctx, "shared") {
        builder = builder.arg("--shared_dir").path_arg(&shared);
    }

    Ok(builder.current_dir(&layout.logs_dir()).inherit_stdio().build())
}

/// Move the engine reports from `logs` into `outputs/reports`
pub fn relocate_reports(layout: &ProjectLayout) -> Result<Vec<PathBuf>> {
    let dest_dir = layout.outputs_dir().join("reports");
    let mut moved = Vec::new();
    for (_, file) in REPORT_FILES {
        let source = layout.logs_dir().join(file);
        if !source.is_file() {
            continue;
        }
        std::fs::create_dir_all(&dest_dir)
            .with_context(|| format!("Failed to create {}", dest_dir.display()))?;
        let dest = dest_dir.join(file);
        if fs_ops::path_occupied(&dest) {
            fs_ops::remove_path(&dest)?;
        }
        fs_ops::move_path(&source, &dest)?;
        moved.push(dest);
    }
    Ok(moved)
}

fn process_intermediates(
    layout: &ProjectLayout,
    options: &RunWorkflowOptions,
) -> Result<IntermediateReport> {
    let mut report = intermediates::scan(&layout.work_dir(), &options.delete_suffixes)?;
    let size = intermediates::format_size(report.bytes);
    println!(
        "{} intermediate file(s) under {} take {}.",
        report.files.len(),
        layout.work_dir().display(),
        size
    );

    if report.files.is_empty() {
        return Ok(report);
    }
    if options.confirm_intermediates_deletion {
        intermediates::delete(&mut report)?;
        println!("Deleted intermediate files, reclaimed {size}.");
    } else {
        println!("Re-run with --confirm-intermediates-deletion to delete them.");
    }
    Ok(report)
}

/// `raft run-workflow`. A failing engine run is reported, not returned as an
/// error; post-processing is skipped in that case.
pub async fn run_workflow(
    ctx: &RaftContext,
    layout: &ProjectLayout,
    options: &RunWorkflowOptions,
) -> Result<RunOutcome> {
    let command = build_command(ctx, layout, options)?;
    let command_line = command.command_line();

    if !options.keep_previous_outputs {
        debug!("Clearing {}", layout.outputs_dir().display());
        fs_ops::clear_dir(&layout.outputs_dir())?;
    }
    std::fs::create_dir_all(layout.logs_dir())
        .with_context(|| format!("Failed to create {}", layout.logs_dir().display()))?;

    info!("Running {}", command_line);
    if prompt::is_interactive() {
        println!("{command_line}");
    }
    let output = ctx
        .subprocess
        .runner()
        .run(command)
        .await
        .with_context(|| format!("Failed to run {NEXTFLOW}"))?;

    let mut outcome = RunOutcome {
        command: command_line,
        status: output.status.clone(),
        moved_reports: Vec::new(),
        intermediates: None,
    };

    if !output.status.success() {
        warn!(
            "Workflow run for project {} did not succeed ({:?}); skipping post-processing",
            layout.id(),
            output.status
        );
        return Ok(outcome);
    }

    outcome.moved_reports = relocate_reports(layout)?;
    if !options.keep_intermediates {
        outcome.intermediates = Some(process_intermediates(layout, options)?);
    }
    info!("Workflow run for project {} finished", layout.id());
    Ok(outcome)
}
