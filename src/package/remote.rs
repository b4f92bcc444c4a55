//! `raft push-project` / `raft pull-project`: sync `rftpkgs` with its remote

use anyhow::{Context, Result};
use tracing::info;

use crate::context::RaftContext;
use crate::project::ProjectLayout;
use crate::subprocess::GitRunner;

const ORIGIN: &str = "origin";

#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Single package to commit (default: everything in `rftpkgs`)
    pub rftpkg: Option<String>,
    /// Set as `origin` before pushing
    pub repo: Option<String>,
    pub comment: Option<String>,
    pub branch: String,
}

fn commit_message(comment: Option<&str>) -> String {
    match comment {
        Some(comment) => comment.to_string(),
        None => format!(
            "rftpkg commit {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ),
    }
}

pub async fn push_project(ctx: &RaftContext, layout: &ProjectLayout, options: &PushOptions) -> Result<String> {
    let git = ctx.subprocess.git();
    let rftpkgs = layout.rftpkgs_dir();

    if let Some(url) = &options.repo {
        git.remote_add(&rftpkgs, ORIGIN, url)
            .await
            .with_context(|| format!("Failed to add remote {url}"))?;
    }

    let file = options.rftpkg.as_deref().map(|name| {
        if name.ends_with(".rftpkg") {
            name.to_string()
        } else {
            format!("{name}.rftpkg")
        }
    });
    let files: Vec<&str> = match &file {
        Some(file) => vec![file.as_str()],
        None => vec!["."],
    };
    git.add(&rftpkgs, &files)
        .await
        .with_context(|| format!("Failed to stage packages in {}", rftpkgs.display()))?;

    let hash = git
        .commit(&rftpkgs, &commit_message(options.comment.as_deref()))
        .await
        .context("Failed to commit packages")?;
    git.push(&rftpkgs, ORIGIN, &options.branch)
        .await
        .with_context(|| format!("Failed to push packages to {ORIGIN}/{}", options.branch))?;

    info!("Pushed {} ({}) to {}/{}", layout.id(), hash, ORIGIN, options.branch);
    Ok(hash)
}

pub async fn pull_project(ctx: &RaftContext, layout: &ProjectLayout, branch: &str) -> Result<()> {
    ctx.subprocess
        .git()
        .pull(&layout.rftpkgs_dir(), Some(ORIGIN), Some(branch))
        .await
        .with_context(|| format!("Failed to pull packages from {ORIGIN}/{branch}"))?;
    info!("Pulled packages for {} from {}/{}", layout.id(), ORIGIN, branch);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaftConfig;
    use crate::subprocess::SubprocessManager;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RaftContext, crate::subprocess::MockProcessRunner, ProjectLayout) {
        let temp = TempDir::new().unwrap();
        let (subprocess, mock) = SubprocessManager::mock();
        let ctx = RaftContext::new(
            temp.path().to_path_buf(),
            RaftConfig::with_defaults(temp.path()),
            subprocess,
        );
        let layout = ctx.project("demo").unwrap();
        std::fs::create_dir_all(layout.rftpkgs_dir()).unwrap();
        (temp, ctx, mock, layout)
    }

    #[test]
    fn test_default_commit_message() {
        assert_eq!(commit_message(Some("release")), "release");
        assert!(commit_message(None).starts_with("rftpkg commit "));
    }

    #[tokio::test]
    async fn test_push_commits_and_pushes() {
        let (_temp, ctx, mut mock, layout) = setup();
        mock.expect_command("git")
            .with_args(|args| args.first().map(String::as_str) == Some("commit"))
            .returns_stdout("[main 1a2b3c4] snapshot\n")
            .finish();
        mock.expect_command("git").returns_success().finish();

        let hash = push_project(
            &ctx,
            &layout,
            &PushOptions {
                rftpkg: Some("demo".to_string()),
                repo: Some("git@example.org:lab/demo.git".to_string()),
                comment: Some("snapshot".to_string()),
                branch: "main".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(hash, "1a2b3c4");
        let calls = mock.get_call_history();
        let subcommands: Vec<&str> = calls.iter().map(|c| c.args[0].as_str()).collect();
        assert_eq!(subcommands, vec!["remote", "add", "commit", "push"]);
        assert_eq!(calls[1].args, vec!["add", "demo.rftpkg"]);
        assert_eq!(calls[3].args, vec!["push", "origin", "main"]);
    }

    #[tokio::test]
    async fn test_pull_failure_is_reported() {
        let (_temp, ctx, mut mock, layout) = setup();
        mock.expect_command("git")
            .returns_exit_code(1)
            .returns_stderr("fatal: couldn't find remote ref dev")
            .finish();

        let err = pull_project(&ctx, &layout, "dev").await.unwrap_err();
        assert!(err.to_string().contains("origin/dev"));
    }
}
