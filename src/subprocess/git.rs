use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::builder::ProcessCommandBuilder;
use super::error::ProcessError;
use super::runner::{ProcessCommand, ProcessOutput, ProcessRunner};

/// The git operations RAFT delegates to the `git` binary.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn init(&self, path: &Path) -> Result<(), ProcessError>;
    async fn remote_add(&self, path: &Path, name: &str, url: &str) -> Result<(), ProcessError>;
    async fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<(), ProcessError>;
    async fn pull(&self, path: &Path, remote: Option<&str>, branch: Option<&str>)
        -> Result<(), ProcessError>;
    async fn add(&self, path: &Path, files: &[&str]) -> Result<(), ProcessError>;
    async fn commit(&self, path: &Path, message: &str) -> Result<String, ProcessError>;
    async fn push(&self, path: &Path, remote: &str, branch: &str) -> Result<(), ProcessError>;
    async fn current_branch(&self, path: &Path) -> Result<String, ProcessError>;
}

pub struct GitRunnerImpl {
    runner: Arc<dyn ProcessRunner>,
}

/// Translate a non-zero exit into an error carrying the command and its stderr.
#[inline]
fn check_command_success(command: &ProcessCommand, output: &ProcessOutput) -> Result<(), ProcessError> {
    if output.status.success() {
        Ok(())
    } else {
        Err(ProcessError::ExitCode {
            command: command.command_line(),
            code: output.status.code().unwrap_or(1),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Extract the abbreviated hash from `git commit` output ("[main 1a2b3c4] message").
fn parse_commit_hash(stdout: &str) -> Option<String> {
    let first = stdout.lines().next()?;
    let inner = first.strip_prefix('[')?.split(']').next()?;
    inner.split_whitespace().last().map(str::to_string)
}

impl GitRunnerImpl {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    async fn run_checked(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let output = self.runner.run(command.clone()).await?;
        check_command_success(&command, &output)?;
        Ok(output)
    }
}

#[async_trait]
impl GitRunner for GitRunnerImpl {
    async fn init(&self, path: &Path) -> Result<(), ProcessError> {
        self.run_checked(
            ProcessCommandBuilder::new("git")
                .arg("init")
                .current_dir(path)
                .build(),
        )
        .await?;
        Ok(())
    }

    async fn remote_add(&self, path: &Path, name: &str, url: &str) -> Result<(), ProcessError> {
        self.run_checked(
            ProcessCommandBuilder::new("git")
                .args(["remote", "add", name, url])
                .current_dir(path)
                .build(),
        )
        .await?;
        Ok(())
    }

    async fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<(), ProcessError> {
        self.run_checked(
            ProcessCommandBuilder::new("git")
                .args(["clone", "--quiet", "--branch", branch, url])
                .path_arg(dest)
                .build(),
        )
        .await?;
        Ok(())
    }

    async fn pull(
        &self,
        path: &Path,
        remote: Option<&str>,
        branch: Option<&str>,
    ) -> Result<(), ProcessError> {
        let mut builder = ProcessCommandBuilder::new("git").arg("pull");
        if let Some(remote) = remote {
            builder = builder.arg(remote);
            if let Some(branch) = branch {
                builder = builder.arg(branch);
            }
        }
        self.run_checked(builder.current_dir(path).build()).await?;
        Ok(())
    }

    async fn add(&self, path: &Path, files: &[&str]) -> Result<(), ProcessError> {
        self.run_checked(
            ProcessCommandBuilder::new("git")
                .arg("add")
                .args(files)
                .current_dir(path)
                .build(),
        )
        .await?;
        Ok(())
    }

    async fn commit(&self, path: &Path, message: &str) -> Result<String, ProcessError> {
        let output = self
            .run_checked(
                ProcessCommandBuilder::new("git")
                    .args(["commit", "-m", message])
                    .current_dir(path)
                    .build(),
            )
            .await?;
        Ok(parse_commit_hash(&output.stdout).unwrap_or_default())
    }

    async fn push(&self, path: &Path, remote: &str, branch: &str) -> Result<(), ProcessError> {
        self.run_checked(
            ProcessCommandBuilder::new("git")
                .args(["push", remote, branch])
                .current_dir(path)
                .build(),
        )
        .await?;
        Ok(())
    }

    async fn current_branch(&self, path: &Path) -> Result<String, ProcessError> {
        let output = self
            .run_checked(
                ProcessCommandBuilder::new("git")
                    .args(["branch", "--show-current"])
                    .current_dir(path)
                    .build(),
            )
            .await?;
        Ok(output.stdout.trim().to_string())
    }
}
