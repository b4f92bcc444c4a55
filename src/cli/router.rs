//! Command routing and execution
//!
//! Routes parsed commands to their handlers, checks that the target project
//! exists first and records successful invocations in the audit log.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::cli::args::Commands;
use crate::cli::help::generate_help;
use crate::config::setup::{run_setup, SetupOptions};
use crate::context::RaftContext;
use crate::module::{self, listing, BranchSpec, LoadModuleOptions};
use crate::nextflow::{add_step, AddStepRequest};
use crate::package::{self, LoadProjectOptions, PackageOptions, PushOptions};
use crate::project::{
    self, audit, AssetKind, CopyParametersOptions, InitProjectOptions, LoadAssetOptions, ParameterSource,
};
use crate::runner::{self, intermediates, CleanOptions, RunWorkflowOptions};
use crate::subprocess::SubprocessManager;

/// The command line as recorded in the audit log: `raft` and the shell-quoted arguments
pub fn invocation_line<S: AsRef<str>>(args: &[S]) -> String {
    let rest: Vec<&str> = args.iter().skip(1).map(AsRef::as_ref).collect();
    if rest.is_empty() {
        "raft".to_string()
    } else {
        format!("raft {}", shell_words::join(rest))
    }
}

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Option<Commands>, raft_dir: &Path, invocation: &str) -> Result<()> {
    let Some(command) = command else {
        println!("{}", generate_help());
        return Ok(());
    };

    if let Commands::Setup { use_defaults } = command {
        run_setup(raft_dir, SetupOptions { use_defaults })?;
        return Ok(());
    }

    let ctx = RaftContext::load(raft_dir, SubprocessManager::production())?;
    execute_with_context(&ctx, command, invocation).await
}

/// Run `command` against an already loaded installation
pub async fn execute_with_context(ctx: &RaftContext, command: Commands, invocation: &str) -> Result<()> {
    let existing = match command.project_id() {
        Some(id) if command.requires_existing_project() => Some(ctx.existing_project(id)?),
        _ => None,
    };
    let audited = command.is_audited();
    let commented = matches!(command, Commands::AddStep { .. });
    debug!("Dispatching {}", command.name());

    dispatch(ctx, command, invocation).await?;

    if let (true, Some(layout)) = (audited, existing) {
        audit::record(&layout, invocation, commented)?;
    }
    Ok(())
}

async fn dispatch(ctx: &RaftContext, command: Commands, invocation: &str) -> Result<()> {
    match command {
        Commands::Setup { use_defaults } => {
            run_setup(&ctx.raft_dir, SetupOptions { use_defaults })?;
        }
        Commands::InitProject {
            project_id,
            init_config,
            repo_url,
        } => {
            project::init_project(
                ctx,
                &InitProjectOptions {
                    project_id,
                    init_config,
                    repo_url,
                    invocation: invocation.to_string(),
                },
            )
            .await?;
        }
        Commands::LoadReference {
            project_id,
            file,
            sub_dir,
            mode,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let options = LoadAssetOptions {
                kind: AssetKind::Reference,
                file,
                sub_dir,
                mode,
            };
            project::load_asset(ctx, &layout, &options)?;
        }
        Commands::LoadMetadata {
            project_id,
            file,
            sub_dir,
            mode,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let options = LoadAssetOptions {
                kind: AssetKind::Metadata,
                file,
                sub_dir,
                mode,
            };
            project::load_asset(ctx, &layout, &options)?;
        }
        Commands::LoadModule {
            project_id,
            module,
            repo,
            branches,
            no_deps,
            delay,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let options = LoadModuleOptions {
                module,
                repo,
                branches: branches.parse::<BranchSpec>()?,
                no_deps,
                delay: Duration::from_secs(delay),
            };
            let report = module::load_module(ctx, &layout, &options).await?;
            for name in &report.cloned {
                println!("Loaded module {name}");
            }
            for name in &report.present {
                println!("Module {name} already loaded");
            }
        }
        Commands::ListSteps {
            project_id,
            module,
            step,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let listing = module::list_steps(&layout, module.as_deref(), step.as_deref())?;
            print!("{}", listing::render(&listing));
        }
        Commands::UpdateMounts { project_id, dir } => {
            let layout = ctx.existing_project(&project_id)?;
            project::update_mounts(&layout, &dir)?;
        }
        Commands::AddStep {
            project_id,
            module,
            step,
            subworkflow,
            alias,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let request = AddStepRequest {
                module,
                step,
                alias,
                subworkflow,
            };
            let insertion = add_step(&layout, &request)?;
            println!("Added `{}` to {}", insertion.call, insertion.target.display());
            if !insertion.declared.is_empty() {
                println!("Declared {} parameter(s).", insertion.declared.len());
            }
            println!("Previous version saved as {}", insertion.backup.display());
        }
        Commands::RunWorkflow {
            project_id,
            workflow,
            nf_params,
            no_resume,
            keep_previous_outputs,
            no_reports,
            keep_intermediates,
            confirm_intermediates_deletion,
            delete_suffixes,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let delete_suffixes = if delete_suffixes.is_empty() {
                intermediates::DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect()
            } else {
                delete_suffixes
            };
            let options = RunWorkflowOptions {
                workflow,
                nf_params,
                resume: !no_resume,
                keep_previous_outputs,
                reports: !no_reports,
                keep_intermediates,
                confirm_intermediates_deletion,
                delete_suffixes,
            };
            let outcome = runner::run_workflow(ctx, &layout, &options).await?;
            if !outcome.status.success() {
                println!("Workflow did not complete; see {}", layout.logs_dir().display());
            }
        }
        Commands::PackageProject {
            project_id,
            output,
            no_git,
            no_checksums,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let options = PackageOptions {
                output,
                no_git,
                no_checksums,
            };
            let archive = package::package_project(&layout, &options)?;
            println!("Wrote {}", archive.display());
        }
        Commands::LoadProject {
            project_id,
            rftpkg,
            repo_url,
            branch,
        } => {
            let options = LoadProjectOptions {
                rftpkg,
                project_id,
                repo_url,
                branch,
                invocation: invocation.to_string(),
            };
            package::load_project(ctx, &options).await?;
        }
        Commands::PushProject {
            project_id,
            rftpkg,
            repo,
            comment,
            branch,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let options = PushOptions {
                rftpkg,
                repo,
                comment,
                branch,
            };
            let hash = package::push_project(ctx, &layout, &options).await?;
            println!("Pushed packages of {} ({hash}) to origin/{}", layout.id(), options.branch);
        }
        Commands::PullProject { project_id, branch } => {
            let layout = ctx.existing_project(&project_id)?;
            package::pull_project(ctx, &layout, &branch).await?;
            println!("Pulled packages of {} from origin/{branch}", layout.id());
        }
        Commands::UpdateModules {
            project_id,
            modules,
            delay,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let updated = module::update_modules(ctx, &layout, &modules, Duration::from_secs(delay)).await?;
            for name in updated {
                println!("Updated module {name}");
            }
        }
        Commands::RenameProject { project_id, new_id } => {
            project::rename_project(ctx, &project_id, &new_id)?;
        }
        Commands::CleanProject {
            project_id,
            keep_latest,
            no_exec,
        } => {
            let layout = ctx.existing_project(&project_id)?;
            let report = runner::clean_project(ctx, &layout, CleanOptions { keep_latest, no_exec }).await?;
            if report.removed {
                println!(
                    "Cleaned {} stale work director(ies); kept {} from run(s) {}",
                    report.stale.len(),
                    report.kept,
                    report.runs.join(", ")
                );
            }
        }
        Commands::CopyParameters {
            project_id,
            source,
            config,
        } => {
            let source = match (source, config) {
                (Some(project), _) => ParameterSource::Project(project),
                (None, Some(path)) => ParameterSource::ConfigFile(path),
                (None, None) => anyhow::bail!("copy-parameters needs a source project (-s) or config file (-c)"),
            };
            project::copy_parameters(
                ctx,
                &CopyParametersOptions {
                    source,
                    dest_project: project_id,
                },
            )?;
        }
    }
    Ok(())
}
