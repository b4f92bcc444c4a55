//! Workflow modules: cloning, dependency loading, updating and listing
//!
//! A module is a git repository cloned into `workflow/<module>` holding
//! `<module>.nf` and optionally `<module>.config`. Repositories are laid out
//! as `<repo url>/<subgroup>/<module>`; subgroups are tried in order.

pub mod branches;
pub mod listing;
pub mod nf_config;
pub mod worklist;

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::context::RaftContext;
use crate::error::RaftError;
use crate::fs_ops;
use crate::nextflow::ModuleScript;
use crate::project::ProjectLayout;
use crate::subprocess::GitRunner;

pub use branches::BranchSpec;
pub use listing::{list_steps, ModuleSteps};
pub use worklist::{module_dependencies, ModuleWorklist};

/// Pause between consecutive remote operations
pub const DEFAULT_DELAY: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct LoadModuleOptions {
    pub module: String,
    /// Logical repository name from `nextflow_repos`
    pub repo: String,
    pub branches: BranchSpec,
    pub no_deps: bool,
    pub delay: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Modules cloned by this invocation
    pub cloned: Vec<String>,
    /// Modules that were already present
    pub present: Vec<String>,
}

/// Clone `module` into `workflow/<module>`, trying each subgroup in turn
async fn clone_module(
    ctx: &RaftContext,
    layout: &ProjectLayout,
    repo_url: &str,
    subgroups: &[String],
    module: &str,
    branch: &str,
) -> Result<()> {
    let git = ctx.subprocess.git();
    let dest = layout.module_dir(module);
    let repo_url = repo_url.trim_end_matches('/');

    for subgroup in subgroups {
        let url = format!("{repo_url}/{subgroup}/{module}");
        debug!("Trying {} (branch {})", url, branch);
        match git.clone_branch(&url, branch, &dest).await {
            Ok(()) => {
                info!("Cloned {} from {}", module, url);
                return Ok(());
            }
            Err(e) => {
                debug!("Clone of {} failed: {}", url, e);
                if fs_ops::path_occupied(&dest) {
                    fs_ops::remove_path(&dest)?;
                }
            }
        }
    }

    Err(RaftError::ModuleNotFound {
        module: module.to_string(),
        subgroups: subgroups.to_vec(),
    }
    .into())
}

/// `raft load-module`: clone a module and, unless `no_deps`, every module
/// it includes, merging each new module's config into `nextflow.config`.
pub async fn load_module(
    ctx: &RaftContext,
    layout: &ProjectLayout,
    options: &LoadModuleOptions,
) -> Result<LoadReport> {
    let repo_url = ctx.config.module_repo_url(&options.repo)?.to_string();
    let subgroups = ctx.config.module_subgroups(&options.repo);
    let mut worklist = ModuleWorklist::new([options.module.as_str()]);
    let mut report = LoadReport::default();

    while let Some(module) = worklist.next_module() {
        if layout.has_module(&module) {
            debug!("Module {} already loaded", module);
            report.present.push(module.clone());
        } else {
            if !report.cloned.is_empty() && !options.delay.is_zero() {
                debug!("Waiting {:?} before the next clone", options.delay);
                tokio::time::sleep(options.delay).await;
            }
            let branch = options.branches.branch_for(&module);
            clone_module(ctx, layout, &repo_url, &subgroups, &module, branch).await?;
            nf_config::merge_file(&layout.nextflow_config(), &layout.module_config(&module))?;
            report.cloned.push(module.clone());
        }

        if options.no_deps {
            continue;
        }
        let script_path = layout.module_script(&module);
        if script_path.is_file() {
            let deps = module_dependencies(&ModuleScript::read(&script_path)?);
            let added = worklist.extend(deps);
            debug!("{} queued {} new dependency module(s)", module, added);
        }
    }

    Ok(report)
}

/// `raft update-modules`: `git pull` in each selected (default: every)
/// loaded module. Failed pulls are reported and skipped.
pub async fn update_modules(
    ctx: &RaftContext,
    layout: &ProjectLayout,
    modules: &[String],
    delay: Duration,
) -> Result<Vec<String>> {
    let selected = if modules.is_empty() {
        layout.loaded_modules()?
    } else {
        modules.to_vec()
    };

    let git = ctx.subprocess.git();
    let mut updated = Vec::new();
    for (idx, module) in selected.iter().enumerate() {
        let dir = layout.module_dir(module);
        if !layout.has_module(module) {
            warn!("Module {} is not loaded in project {}, skipping", module, layout.id());
            continue;
        }
        if !dir.join(".git").exists() {
            warn!("{} is not a git checkout, skipping", dir.display());
            continue;
        }
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match git.pull(&dir, None, None).await {
            Ok(()) => {
                info!("Updated module {}", module);
                updated.push(module.clone());
            }
            Err(e) => warn!("Failed to update module {}: {}", module, e),
        }
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaftConfig;
    use crate::subprocess::{MockProcessRunner, SubprocessManager};
    use tempfile::TempDir;

    fn setup() -> (TempDir, RaftContext, MockProcessRunner, ProjectLayout) {
        let temp = TempDir::new().unwrap();
        let (subprocess, mock) = SubprocessManager::mock();
        let ctx = RaftContext::new(
            temp.path().to_path_buf(),
            RaftConfig::with_defaults(temp.path()),
            subprocess,
        );
        let layout = ctx.project("demo").unwrap();
        std::fs::create_dir_all(layout.workflow_dir()).unwrap();
        std::fs::write(layout.nextflow_config(), "process {\n}\n").unwrap();
        (temp, ctx, mock, layout)
    }

    fn options(module: &str) -> LoadModuleOptions {
        LoadModuleOptions {
            module: module.to_string(),
            repo: crate::config::DEFAULT_MODULE_REPO.to_string(),
            branches: BranchSpec::default(),
            no_deps: false,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_tries_subgroups_in_order() {
        let (_temp, ctx, mut mock, layout) = setup();
        mock.expect_command("git")
            .with_args(|args| args.iter().any(|a| a.ends_with("/Tools/alignment")))
            .returns_exit_code(128)
            .returns_stderr("not found")
            .finish();
        mock.expect_command("git")
            .with_args(|args| args.iter().any(|a| a.ends_with("/Projects/alignment")))
            .returns_success()
            .finish();

        let report = load_module(&ctx, &layout, &options("alignment")).await.unwrap();
        assert_eq!(report.cloned, vec!["alignment"]);

        let history = mock.get_call_history();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history[1].args[..4],
            ["clone", "--quiet", "--branch", "main"]
        );
    }

    #[tokio::test]
    async fn test_module_not_found_in_any_subgroup() {
        let (_temp, ctx, mut mock, layout) = setup();
        mock.expect_command("git").returns_exit_code(128).finish();

        let err = load_module(&ctx, &layout, &options("nothing")).await.unwrap_err();
        match err.downcast_ref::<RaftError>() {
            Some(RaftError::ModuleNotFound { subgroups, .. }) => assert_eq!(subgroups.len(), 3),
            other => panic!("Expected ModuleNotFound, got {other:?}"),
        }
        assert!(mock.verify_called("git", 3));
    }

    #[tokio::test]
    async fn test_present_modules_are_not_cloned_and_deps_are_followed() {
        let (_temp, ctx, mut mock, layout) = setup();
        std::fs::create_dir_all(layout.module_dir("alignment")).unwrap();
        std::fs::write(
            layout.module_script("alignment"),
            "include { sort } from '../samtools/samtools.nf'\n",
        )
        .unwrap();
        mock.expect_command("git").returns_success().finish();

        let report = load_module(&ctx, &layout, &options("alignment")).await.unwrap();
        assert_eq!(report.present, vec!["alignment"]);
        assert_eq!(report.cloned, vec!["samtools"]);
        assert!(mock.verify_called("git", 1));
    }

    #[tokio::test]
    async fn test_no_deps_stops_after_first_module() {
        let (_temp, ctx, mock, layout) = setup();
        std::fs::create_dir_all(layout.module_dir("alignment")).unwrap();
        std::fs::write(
            layout.module_script("alignment"),
            "include { sort } from '../samtools/samtools.nf'\n",
        )
        .unwrap();

        let mut opts = options("alignment");
        opts.no_deps = true;
        let report = load_module(&ctx, &layout, &opts).await.unwrap();
        assert!(report.cloned.is_empty());
        assert!(mock.get_call_history().is_empty());
    }

    #[tokio::test]
    async fn test_update_modules_pulls_git_checkouts() {
        let (_temp, ctx, mut mock, layout) = setup();
        std::fs::create_dir_all(layout.module_dir("alignment").join(".git")).unwrap();
        std::fs::create_dir_all(layout.module_dir("scratch")).unwrap();
        mock.expect_command("git")
            .with_args(|args| args == ["pull"])
            .returns_success()
            .finish();

        let updated = update_modules(&ctx, &layout, &[], Duration::ZERO).await.unwrap();
        assert_eq!(updated, vec!["alignment"]);
    }

    #[tokio::test]
    async fn test_update_skips_unknown_modules() {
        let (_temp, ctx, mock, layout) = setup();
        let updated = update_modules(&ctx, &layout, &["variants".to_string()], Duration::ZERO)
            .await
            .unwrap();
        assert!(updated.is_empty());
        assert!(mock.get_call_history().is_empty());
    }
}
