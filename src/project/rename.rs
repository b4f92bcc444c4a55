//! `raft rename-project`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{rewrite_project_id, ProjectLayout};
use crate::context::RaftContext;
use crate::error::RaftError;

/// Rename a project: rewrite the files that embed its location or id
/// (keeping `.rename.bak` copies), then move the directory.
pub fn rename_project(ctx: &RaftContext, old_id: &str, new_id: &str) -> Result<ProjectLayout> {
    let old = ctx.existing_project(old_id)?;
    let new = ctx.project(new_id)?;
    if new.root().exists() {
        return Err(RaftError::ProjectExists {
            path: new.root().to_path_buf(),
        }
        .into());
    }

    let old_root = old.root().display().to_string();
    let new_root = new.root().display().to_string();

    for path in [old.mounts_config(), old.nextflow_config()] {
        rewrite_file(&path, |content| replace_root(content, &old_root, &new_root))?;
    }
    rewrite_file(&old.audit_log(), |content| {
        rewrite_project_id(content, old_id, new_id)
    })?;

    let old_identifier = format!("params.project_identifier = '{old_id}'");
    let new_identifier = format!("params.project_identifier = '{new_id}'");
    rewrite_file(&old.main_workflow(), |content| {
        content.replace(&old_identifier, &new_identifier)
    })?;

    std::fs::rename(old.root(), new.root()).with_context(|| {
        format!(
            "Failed to move {} to {}",
            old.root().display(),
            new.root().display()
        )
    })?;

    info!("Renamed project {} to {}", old_id, new_id);
    println!("Renamed project {old_id} to {new_id}.");
    Ok(new)
}

/// Replace `old_root` where it names the whole directory, so siblings
/// sharing its prefix (`<root>_refs`) keep their paths.
fn replace_root(content: &str, old_root: &str, new_root: &str) -> String {
    let mut rewritten = String::with_capacity(content.len());
    let mut last = 0;
    for (idx, _) in content.match_indices(old_root) {
        let end = idx + old_root.len();
        let continues_name = content[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !continues_name {
            rewritten.push_str(&content[last..idx]);
            rewritten.push_str(new_root);
            last = end;
        }
    }
    rewritten.push_str(&content[last..]);
    rewritten
}

fn rewrite_file(path: &Path, rewrite: impl FnOnce(&str) -> String) -> Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let backup = PathBuf::from(format!("{}.rename.bak", path.display()));
    std::fs::write(&backup, &content)
        .with_context(|| format!("Failed to write {}", backup.display()))?;
    std::fs::write(path, rewrite(&content))
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaftConfig;
    use crate::project::MountManifest;
    use crate::subprocess::SubprocessManager;
    use tempfile::TempDir;

    #[test]
    fn test_rename_rewrites_and_moves() {
        let temp = TempDir::new().unwrap();
        let ctx = RaftContext::new(
            temp.path().to_path_buf(),
            RaftConfig::with_defaults(temp.path()),
            SubprocessManager::mock().0,
        );
        let old = ctx.project("demo").unwrap();
        std::fs::create_dir_all(old.workflow_dir()).unwrap();
        std::fs::create_dir_all(old.state_dir()).unwrap();
        MountManifest::new(&old.mounts_config(), [old.root(), temp.path()])
            .save()
            .unwrap();
        std::fs::write(old.audit_log(), "raft init-project -p demo\n").unwrap();
        std::fs::write(
            old.main_workflow(),
            "params.project_identifier = 'demo'\nparams.project_dir = ''\n",
        )
        .unwrap();

        let new = rename_project(&ctx, "demo", "trial").unwrap();

        assert!(!old.root().exists());
        let mounts = std::fs::read_to_string(new.mounts_config()).unwrap();
        assert!(mounts.starts_with(&new.root().display().to_string()));
        assert_eq!(
            std::fs::read_to_string(new.audit_log()).unwrap(),
            "raft init-project -p trial\n"
        );
        assert!(std::fs::read_to_string(new.main_workflow())
            .unwrap()
            .contains("params.project_identifier = 'trial'"));
        assert!(new.dir(".raft/auto.raft.rename.bak").is_file());
    }

    #[test]
    fn test_replace_root_skips_sibling_prefixes() {
        let content = "/raft/projects/demo,/raft/projects/demo_refs/ref.fa,/raft/projects/demo/outputs\nparams.dir = '/raft/projects/demo'\n";
        assert_eq!(
            replace_root(content, "/raft/projects/demo", "/raft/projects/trial"),
            "/raft/projects/trial,/raft/projects/demo_refs/ref.fa,/raft/projects/trial/outputs\nparams.dir = '/raft/projects/trial'\n"
        );
    }

    #[test]
    fn test_rename_keeps_sibling_mounts() {
        let temp = TempDir::new().unwrap();
        let ctx = RaftContext::new(
            temp.path().to_path_buf(),
            RaftConfig::with_defaults(temp.path()),
            SubprocessManager::mock().0,
        );
        let old = ctx.project("demo").unwrap();
        std::fs::create_dir_all(old.workflow_dir()).unwrap();
        let sibling = temp.path().join("projects/demo_refs/ref.fa");
        MountManifest::new(&old.mounts_config(), [old.root(), sibling.as_path()])
            .save()
            .unwrap();

        let new = rename_project(&ctx, "demo", "trial").unwrap();

        let mounts = std::fs::read_to_string(new.mounts_config()).unwrap();
        assert!(mounts.contains(&sibling.display().to_string()));
        assert!(mounts.contains(&new.root().display().to_string()));
        assert!(!mounts.contains(&format!("{},", old.root().display())));
    }

    #[test]
    fn test_rename_onto_existing_project_fails() {
        let temp = TempDir::new().unwrap();
        let ctx = RaftContext::new(
            temp.path().to_path_buf(),
            RaftConfig::with_defaults(temp.path()),
            SubprocessManager::mock().0,
        );
        std::fs::create_dir_all(temp.path().join("projects/a")).unwrap();
        std::fs::create_dir_all(temp.path().join("projects/b")).unwrap();

        let err = rename_project(&ctx, "a", "b").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RaftError>(),
            Some(RaftError::ProjectExists { .. })
        ));
        assert!(temp.path().join("projects/a").is_dir());
    }
}
