//! `raft clean-project`: reclaim space held by stale task directories

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::history::{self, HistoryEntry};
use super::NEXTFLOW;
use crate::context::RaftContext;
use crate::error::RaftError;
use crate::fs_ops;
use crate::project::ProjectLayout;
use crate::prompt;
use crate::subprocess::ProcessCommandBuilder;

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    /// Keep only the latest successful run's directories (asks first)
    pub keep_latest: bool,
    /// Report what would be removed without removing it
    pub no_exec: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    pub runs: Vec<String>,
    pub kept: usize,
    pub stale: Vec<PathBuf>,
    pub removed: bool,
}

/// Entries of a task directory that survive cleaning
fn preserved(name: &str) -> bool {
    name == "meta" || name.starts_with(".command")
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Stdout of `nextflow log <target> [-f <fields>]`, run from `logs/`
async fn nextflow_log(
    ctx: &RaftContext,
    layout: &ProjectLayout,
    target: &str,
    fields: Option<&str>,
) -> Result<String> {
    let mut builder = ProcessCommandBuilder::new(NEXTFLOW).args(["log", target]);
    if let Some(fields) = fields {
        builder = builder.args(["-f", fields]);
    }
    let command = builder.current_dir(&layout.logs_dir()).build();
    let output = ctx
        .subprocess
        .runner()
        .run(command)
        .await
        .with_context(|| format!("Failed to query tasks of {target}"))?;
    if !output.status.success() {
        anyhow::bail!("`{NEXTFLOW} log {}` failed: {}", target, output.stderr.trim());
    }
    Ok(output.stdout)
}

/// Every existing work directory the engine recorded for `session_id`
async fn session_work_dirs(ctx: &RaftContext, layout: &ProjectLayout, session_id: &str) -> Result<Vec<PathBuf>> {
    let stdout = nextflow_log(ctx, layout, session_id, None).await?;
    let mut dirs: Vec<PathBuf> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .filter(|dir| dir.is_dir())
        .collect();
    dirs.sort();
    dirs.dedup();
    Ok(dirs)
}

/// Work directories of `run` whose tasks completed or were cached
async fn kept_work_dirs(ctx: &RaftContext, layout: &ProjectLayout, run: &HistoryEntry) -> Result<Vec<PathBuf>> {
    let stdout = nextflow_log(ctx, layout, &run.run_name, Some("workdir,status")).await?;
    Ok(stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let dir = fields.next()?;
            let status = fields.next()?;
            matches!(status, "COMPLETED" | "CACHED").then(|| PathBuf::from(dir))
        })
        .collect())
}

fn empty_task_dir(dir: &Path) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        if !preserved(&entry.file_name().to_string_lossy()) {
            fs_ops::remove_path(&entry.path())?;
        }
    }
    Ok(())
}

pub async fn clean_project(
    ctx: &RaftContext,
    layout: &ProjectLayout,
    options: CleanOptions,
) -> Result<CleanReport> {
    let history_path = layout.logs_dir().join(".nextflow").join("history");
    let entries = history::read(&history_path)?;
    let latest = history::latest_successful(&entries).ok_or_else(|| RaftError::NoSuccessfulRun {
        path: history_path.clone(),
    })?;

    let keep_latest = options.keep_latest
        && prompt::confirm(&format!(
            "Keep only the work directories of run {} and remove all others?",
            latest.run_name
        ))?;
    if options.keep_latest && !keep_latest {
        println!("Keeping every run of session {} instead.", latest.session_id);
    }
    let runs: Vec<&HistoryEntry> = if keep_latest {
        vec![latest]
    } else {
        history::session_runs(&entries, latest)
    };

    let mut keep = HashSet::new();
    for run in &runs {
        for dir in kept_work_dirs(ctx, layout, run).await? {
            keep.insert(normalize(&dir));
        }
    }
    debug!("{} work director(ies) kept across {} run(s)", keep.len(), runs.len());

    let stale: Vec<PathBuf> = session_work_dirs(ctx, layout, &latest.session_id)
        .await?
        .into_iter()
        .filter(|dir| !keep.contains(&normalize(dir)))
        .collect();

    let mut report = CleanReport {
        runs: runs.iter().map(|r| r.run_name.clone()).collect(),
        kept: keep.len(),
        stale,
        removed: false,
    };

    if options.no_exec {
        for dir in &report.stale {
            println!("Would clean {}", dir.display());
        }
        return Ok(report);
    }

    for dir in &report.stale {
        empty_task_dir(dir)?;
    }
    report.removed = true;
    info!(
        "Cleaned {} stale work director(ies) in project {}",
        report.stale.len(),
        layout.id()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaftConfig;
    use crate::subprocess::{MockProcessRunner, SubprocessManager};
    use tempfile::TempDir;

    const HISTORY: &str = "2024-01-01 10:00:00\t1m\tearly_run\tOK\tr1\tsession-0\tnextflow run\n\
2024-01-02 10:00:00\t1m\tfirst_try\tERR\tr2\tsession-1\tnextflow run\n\
2024-01-02 11:00:00\t1m\tsecond_try\tOK\tr2\tsession-1\tnextflow run -resume\n";

    fn setup() -> (TempDir, RaftContext, MockProcessRunner, ProjectLayout) {
        let temp = TempDir::new().unwrap();
        let (subprocess, mock) = SubprocessManager::mock();
        let ctx = RaftContext::new(
            temp.path().to_path_buf(),
            RaftConfig::with_defaults(temp.path()),
            subprocess,
        );
        let layout = ctx.project("demo").unwrap();
        std::fs::create_dir_all(layout.logs_dir().join(".nextflow")).unwrap();
        for task in ["aa/keep1", "bb/keep2", "cc/stale"] {
            let dir = layout.work_dir().join(task);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("out.bam"), "x").unwrap();
            std::fs::write(dir.join(".command.sh"), "x").unwrap();
        }
        (temp, ctx, mock, layout)
    }

    fn expect_log(mock: &mut MockProcessRunner, run: &'static str, stdout: String) {
        mock.expect_command("nextflow")
            .with_args(move |args| args.get(1).map(String::as_str) == Some(run))
            .returns_stdout(&stdout)
            .finish();
    }

    fn session_listing(work: &Path, tasks: &[&str]) -> String {
        tasks
            .iter()
            .map(|task| format!("{}\n", work.join(task).display()))
            .collect()
    }

    #[tokio::test]
    async fn test_clean_keeps_completed_dirs_of_session() {
        let (_temp, ctx, mut mock, layout) = setup();
        std::fs::write(layout.logs_dir().join(".nextflow/history"), HISTORY).unwrap();
        let work = layout.work_dir();
        expect_log(
            &mut mock,
            "first_try",
            format!("{}\tCOMPLETED\n{}\tFAILED\n", work.join("aa/keep1").display(), work.join("cc/stale").display()),
        );
        expect_log(&mut mock, "second_try", format!("{}\tCACHED\n", work.join("bb/keep2").display()));
        expect_log(&mut mock, "session-1", session_listing(&work, &["aa/keep1", "bb/keep2", "cc/stale"]));

        let report = clean_project(&ctx, &layout, CleanOptions::default()).await.unwrap();

        assert_eq!(report.runs, vec!["first_try", "second_try"]);
        assert_eq!(report.stale, vec![work.join("cc/stale")]);
        assert!(report.removed);
        assert!(!work.join("cc/stale/out.bam").exists());
        assert!(work.join("cc/stale/.command.sh").exists());
        assert!(work.join("aa/keep1/out.bam").exists());
    }

    #[tokio::test]
    async fn test_no_exec_only_reports() {
        let (_temp, ctx, mut mock, layout) = setup();
        std::fs::write(layout.logs_dir().join(".nextflow/history"), HISTORY).unwrap();
        let work = layout.work_dir();
        expect_log(&mut mock, "session-1", session_listing(&work, &["aa/keep1", "bb/keep2", "cc/stale"]));
        mock.expect_command("nextflow").returns_stdout("").finish();

        let report = clean_project(
            &ctx,
            &layout,
            CleanOptions {
                keep_latest: false,
                no_exec: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(report.stale.len(), 3);
        assert!(!report.removed);
        assert!(layout.work_dir().join("cc/stale/out.bam").exists());
    }

    #[tokio::test]
    async fn test_other_sessions_are_left_alone() {
        let (_temp, ctx, mut mock, layout) = setup();
        std::fs::write(layout.logs_dir().join(".nextflow/history"), HISTORY).unwrap();
        let work = layout.work_dir();
        // aa/keep1 belongs to session-0 only
        expect_log(&mut mock, "first_try", String::new());
        expect_log(&mut mock, "second_try", format!("{}\tCOMPLETED\n", work.join("bb/keep2").display()));
        expect_log(&mut mock, "session-1", session_listing(&work, &["bb/keep2", "cc/stale"]));

        let report = clean_project(&ctx, &layout, CleanOptions::default()).await.unwrap();

        assert_eq!(report.stale, vec![work.join("cc/stale")]);
        assert!(work.join("aa/keep1/out.bam").exists());
        assert!(work.join("bb/keep2/out.bam").exists());
        assert!(!work.join("cc/stale/out.bam").exists());
    }

    #[tokio::test]
    async fn test_requires_successful_run() {
        let (_temp, ctx, _mock, layout) = setup();
        let err = clean_project(&ctx, &layout, CleanOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RaftError>(),
            Some(RaftError::NoSuccessfulRun { .. })
        ));
    }
}
