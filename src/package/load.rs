//! `raft load-project`: create a project from an rftpkg

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::checksums::Checksums;
use super::snapshot::{self, SNAPSHOT, SNAPSHOT_ACTUAL};
use super::{unpack_archive, CHECKSUMS_FILE, EXTENSION};
use crate::context::RaftContext;
use crate::error::RaftError;
use crate::fs_ops;
use crate::project::{init_project, rewrite_project_id, InitProjectOptions, ProjectLayout, MOUNTS_CONFIG};
use crate::subprocess::GitRunner;

const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone)]
pub struct LoadProjectOptions {
    /// Package file, or its name inside the pulled repository
    pub rftpkg: PathBuf,
    pub project_id: String,
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    pub invocation: String,
}

fn invalid(path: &Path, reason: impl Into<String>) -> anyhow::Error {
    RaftError::InvalidPackage {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
    .into()
}

fn package_file_name(rftpkg: &Path) -> Result<String> {
    let name = rftpkg
        .file_name()
        .with_context(|| format!("Invalid package path {}", rftpkg.display()))?
        .to_string_lossy()
        .to_string();
    if Path::new(&name).extension().is_some_and(|ext| ext == EXTENSION) {
        Ok(name)
    } else {
        Ok(format!("{name}.{EXTENSION}"))
    }
}

/// Id of the project a package was made from
fn packaged_project_id(state_dir: &Path) -> Option<String> {
    let from_checksums = std::fs::read_to_string(state_dir.join(CHECKSUMS_FILE))
        .ok()
        .and_then(|content| serde_json::from_str::<Checksums>(&content).ok())
        .and_then(|sums| {
            sums.keys()
                .find_map(|key| key.strip_prefix("projects/")?.split('/').next().map(str::to_string))
        });
    from_checksums.or_else(|| {
        std::fs::read_to_string(state_dir.join(SNAPSHOT))
            .ok()
            .and_then(|content| snapshot::initial_project_id(&content))
    })
}

/// Rewrite `path` in place, keeping the original as `<path>.orig`
fn rewrite_keeping_original(path: &Path, old: &str, new: &str) -> Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let original = PathBuf::from(format!("{}.orig", path.display()));
    std::fs::write(&original, &content)
        .with_context(|| format!("Failed to write {}", original.display()))?;
    fs_ops::write_atomic(path, &rewrite_project_id(&content, old, new))
}

async fn fetch_package(ctx: &RaftContext, layout: &ProjectLayout, options: &LoadProjectOptions) -> Result<PathBuf> {
    let rftpkgs = layout.rftpkgs_dir();
    let name = package_file_name(&options.rftpkg)?;
    let dest = rftpkgs.join(&name);

    if options.repo_url.is_some() {
        let branch = options.branch.as_deref().unwrap_or(DEFAULT_BRANCH);
        ctx.subprocess
            .git()
            .pull(&rftpkgs, Some("origin"), Some(branch))
            .await
            .with_context(|| format!("Failed to pull packages into {}", rftpkgs.display()))?;
        if !dest.is_file() {
            return Err(invalid(&dest, "not present in the pulled repository"));
        }
    } else {
        if !options.rftpkg.is_file() {
            return Err(invalid(&options.rftpkg, "file does not exist"));
        }
        std::fs::copy(&options.rftpkg, &dest).with_context(|| {
            format!("Failed to copy {} to {}", options.rftpkg.display(), dest.display())
        })?;
    }
    Ok(dest)
}

async fn install(ctx: &RaftContext, layout: &ProjectLayout, options: &LoadProjectOptions) -> Result<()> {
    let archive = fetch_package(ctx, layout, options).await?;
    let state_dir = layout.state_dir();
    unpack_archive(&archive, &state_dir)?;

    let packaged_workflow = state_dir.join("workflow");
    if !packaged_workflow.is_dir() {
        return Err(invalid(&archive, "no workflow directory"));
    }

    // The fresh manifest binds this installation's directories.
    let fresh_mounts = std::fs::read_to_string(layout.mounts_config())
        .with_context(|| format!("Failed to read {}", layout.mounts_config().display()))?;

    let packaged_metadata = state_dir.join("metadata");
    if packaged_metadata.is_dir() {
        if fs_ops::path_occupied(&layout.metadata_dir()) {
            fs_ops::remove_path(&layout.metadata_dir())?;
        }
        fs_ops::move_path(&packaged_metadata, &layout.metadata_dir())?;
    }

    fs_ops::remove_path(&layout.workflow_dir())?;
    fs_ops::move_path(&packaged_workflow, &layout.workflow_dir())?;
    let packaged_mounts = layout.mounts_config();
    if packaged_mounts.is_file() {
        fs_ops::move_path(
            &packaged_mounts,
            &layout.workflow_dir().join(format!(".{MOUNTS_CONFIG}.orig")),
        )?;
    }
    std::fs::write(layout.mounts_config(), fresh_mounts)
        .with_context(|| format!("Failed to write {}", layout.mounts_config().display()))?;

    let Some(old_id) = packaged_project_id(&state_dir) else {
        warn!("Could not determine the packaged project id; leaving ids as packaged");
        return Ok(());
    };
    if old_id == layout.id() {
        return Ok(());
    }
    debug!("Rewriting project id {} as {}", old_id, layout.id());

    for name in [CHECKSUMS_FILE, SNAPSHOT, SNAPSHOT_ACTUAL] {
        rewrite_keeping_original(&state_dir.join(name), &old_id, layout.id())?;
    }

    let nf_config = layout.nextflow_config();
    if nf_config.is_file() {
        let content = std::fs::read_to_string(&nf_config)
            .with_context(|| format!("Failed to read {}", nf_config.display()))?;
        fs_ops::write_atomic(&nf_config, &rewrite_project_id(&content, &old_id, layout.id()))?;
    }

    let main = layout.main_workflow();
    if main.is_file() {
        let content = std::fs::read_to_string(&main)
            .with_context(|| format!("Failed to read {}", main.display()))?;
        let rewritten = content.replace(
            &format!("params.project_identifier = '{old_id}'"),
            &format!("params.project_identifier = '{}'", layout.id()),
        );
        fs_ops::write_atomic(&main, &rewritten)?;
    }
    Ok(())
}

/// Initialize project `project_id` and populate it from a package.
///
/// A failed load removes the freshly initialized project again.
pub async fn load_project(ctx: &RaftContext, options: &LoadProjectOptions) -> Result<ProjectLayout> {
    let layout = init_project(
        ctx,
        &InitProjectOptions {
            project_id: options.project_id.clone(),
            init_config: None,
            repo_url: options.repo_url.clone(),
            invocation: options.invocation.clone(),
        },
    )
    .await?;

    if let Err(e) = install(ctx, &layout, options).await {
        warn!("Loading package into {} failed, removing it", layout.root().display());
        if let Err(cleanup) = fs_ops::remove_path(layout.root()) {
            warn!("Failed to remove {}: {}", layout.root().display(), cleanup);
        }
        return Err(e);
    }

    info!("Loaded project {} from {}", layout.id(), options.rftpkg.display());
    println!("Loaded project {} from {}", layout.id(), options.rftpkg.display());
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaftConfig;
    use crate::package::{package_project, PackageOptions};
    use crate::subprocess::{MockProcessRunner, SubprocessManager};
    use tempfile::TempDir;

    fn mock_context(raft_dir: &Path) -> (RaftContext, MockProcessRunner) {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("git").returns_success().finish();
        let config = RaftConfig::with_defaults(raft_dir);
        (RaftContext::new(raft_dir.to_path_buf(), config, subprocess), mock)
    }

    async fn packaged_source(ctx: &RaftContext) -> PathBuf {
        let source = init_project(
            ctx,
            &InitProjectOptions {
                project_id: "source".to_string(),
                init_config: None,
                repo_url: None,
                invocation: "raft init-project -p source".to_string(),
            },
        )
        .await
        .unwrap();
        std::fs::write(source.metadata_dir().join("samples.csv"), "s1\n").unwrap();
        crate::project::audit::record(&source, "raft add-step -p source -m alignment -s align", true)
            .unwrap();
        package_project(&source, &PackageOptions::default()).unwrap()
    }

    #[test]
    fn test_package_file_name() {
        assert_eq!(package_file_name(Path::new("/x/demo.rftpkg")).unwrap(), "demo.rftpkg");
        assert_eq!(package_file_name(Path::new("demo")).unwrap(), "demo.rftpkg");
    }

    #[tokio::test]
    async fn test_load_project_rewrites_ids() {
        let temp = TempDir::new().unwrap();
        let (ctx, _mock) = mock_context(temp.path());
        let archive = packaged_source(&ctx).await;

        let layout = load_project(
            &ctx,
            &LoadProjectOptions {
                rftpkg: archive,
                project_id: "copy".to_string(),
                repo_url: None,
                branch: None,
                invocation: "raft load-project -p copy".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(layout.metadata_dir().join("samples.csv")).unwrap(),
            "s1\n"
        );
        let main = std::fs::read_to_string(layout.main_workflow()).unwrap();
        assert!(main.contains("params.project_identifier = 'copy'"));

        let mounts = std::fs::read_to_string(layout.mounts_config()).unwrap();
        assert!(mounts.contains("projects/copy"));
        assert!(layout.workflow_dir().join(".mounts.config.orig").is_file());

        let snapshot = std::fs::read_to_string(layout.state_dir().join(SNAPSHOT)).unwrap();
        assert!(snapshot.contains("raft add-step -p copy -m alignment -s align"));
        let original = std::fs::read_to_string(layout.state_dir().join("snapshot.raft.orig")).unwrap();
        assert!(original.contains("-p source"));

        let checksums = std::fs::read_to_string(layout.state_dir().join(CHECKSUMS_FILE)).unwrap();
        assert!(checksums.contains("projects/copy/metadata/samples.csv"));
        assert!(!checksums.contains("projects/source/"));
    }

    #[tokio::test]
    async fn test_missing_package_removes_project() {
        let temp = TempDir::new().unwrap();
        let (ctx, _mock) = mock_context(temp.path());

        let err = load_project(
            &ctx,
            &LoadProjectOptions {
                rftpkg: temp.path().join("absent.rftpkg"),
                project_id: "copy".to_string(),
                repo_url: None,
                branch: None,
                invocation: "raft load-project -p copy".to_string(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RaftError>(),
            Some(RaftError::InvalidPackage { .. })
        ));
        assert!(!ctx.project("copy").unwrap().root().exists());
    }
}
