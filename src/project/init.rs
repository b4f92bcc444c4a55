//! `raft init-project`

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{audit, MountManifest, ProjectLayout, STATE_DIR, WORKFLOW_DIR};
use crate::config::{INIT_CONFIG_FILE, INIT_WORKFLOW_FILE, NEXTFLOW_CONFIG_TEMPLATE_FILE};
use crate::context::RaftContext;
use crate::error::RaftError;
use crate::nextflow::main_file::PARAMETERS_MARKER;
use crate::subprocess::GitRunner;
use crate::{fs_ops, templates};

const PROJECT_DIR_PARAM: &str = "params.project_dir = ''";

/// Directories every project needs regardless of the init config
const REQUIRED_DIRS: [&str; 5] = [WORKFLOW_DIR, STATE_DIR, "rftpkgs", "logs", "outputs"];

#[derive(Debug, Clone)]
pub struct InitProjectOptions {
    pub project_id: String,
    /// Alternative to `<raft_dir>/.init.cfg`
    pub init_config: Option<PathBuf>,
    /// Remote for the project's rftpkg repository
    pub repo_url: Option<String>,
    /// Command line recorded as the first audit log entry
    pub invocation: String,
}

/// Create and populate a new project directory.
///
/// The directory is created with a single `mkdir`; an existing directory is
/// never touched. If populating fails the new directory is removed again.
pub async fn init_project(ctx: &RaftContext, options: &InitProjectOptions) -> Result<ProjectLayout> {
    let layout = ctx.project(&options.project_id)?;
    let projects_dir = ctx.projects_dir()?;
    std::fs::create_dir_all(&projects_dir)
        .with_context(|| format!("Failed to create {}", projects_dir.display()))?;

    match std::fs::create_dir(layout.root()) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(RaftError::ProjectExists {
                path: layout.root().to_path_buf(),
            }
            .into());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to create {}", layout.root().display()))
        }
    }

    if let Err(e) = populate(ctx, &layout, options).await {
        warn!("Initialization of {} failed, removing it", layout.root().display());
        if let Err(cleanup) = std::fs::remove_dir_all(layout.root()) {
            warn!("Failed to remove {}: {}", layout.root().display(), cleanup);
        }
        return Err(e);
    }

    info!("Initialized project {} at {}", layout.id(), layout.root().display());
    println!("Initialized project {} at {}", layout.id(), layout.root().display());
    Ok(layout)
}

async fn populate(ctx: &RaftContext, layout: &ProjectLayout, options: &InitProjectOptions) -> Result<()> {
    let init_config = read_init_config(&ctx.raft_dir, options.init_config.as_deref())?;
    let mut bind_dirs = vec![layout.root().to_path_buf(), ctx.raft_dir.clone()];

    for (name, target) in &init_config {
        let dest = layout.dir(name);
        if target.is_empty() {
            std::fs::create_dir_all(&dest)
                .with_context(|| format!("Failed to create {}", dest.display()))?;
        } else {
            let target = PathBuf::from(target);
            debug!("Linking {} to {}", dest.display(), target.display());
            fs_ops::symlink(&target, &dest)?;
            bind_dirs.push(target);
        }
    }

    for name in REQUIRED_DIRS {
        let dir = layout.dir(name);
        if !fs_ops::path_occupied(&dir) {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }

    MountManifest::new(&layout.mounts_config(), &bind_dirs).save()?;
    audit::start(layout, &options.invocation)?;

    let workflow_template = read_template(&ctx.raft_dir.join(INIT_WORKFLOW_FILE), templates::MAIN_WORKFLOW)?;
    let main = layout.main_workflow();
    std::fs::write(&main, render_main_workflow(&workflow_template, layout.id()))
        .with_context(|| format!("Failed to write {}", main.display()))?;

    let config_template = read_template(
        &ctx.raft_dir.join(NEXTFLOW_CONFIG_TEMPLATE_FILE),
        templates::NEXTFLOW_CONFIG,
    )?;
    let imgs = ctx.fs_path("imgs")?;
    let nf_config = layout.nextflow_config();
    std::fs::write(
        &nf_config,
        render_nextflow_config(&config_template, &imgs, &layout.mounts_config()),
    )
    .with_context(|| format!("Failed to write {}", nf_config.display()))?;

    let git = ctx.subprocess.git();
    let rftpkgs = layout.rftpkgs_dir();
    git.init(&rftpkgs)
        .await
        .with_context(|| format!("Failed to initialize git repository in {}", rftpkgs.display()))?;
    if let Some(url) = &options.repo_url {
        git.remote_add(&rftpkgs, "origin", url)
            .await
            .with_context(|| format!("Failed to add remote {url}"))?;
    }

    Ok(())
}

/// Subdirectory name mapped to an external location (empty: create locally)
fn read_init_config(raft_dir: &Path, explicit: Option<&Path>) -> Result<BTreeMap<String, String>> {
    let content = match explicit {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read init config {}", path.display()))?,
        None => read_template(&raft_dir.join(INIT_CONFIG_FILE), templates::INIT_CONFIG)?,
    };
    let parsed: BTreeMap<String, String> =
        serde_json::from_str(&content).context("Failed to parse init config")?;

    for name in parsed.keys() {
        if name.is_empty() || name.contains('/') || name == ".." {
            anyhow::bail!("Invalid project subdirectory `{name}` in init config");
        }
    }
    Ok(parsed)
}

fn read_template(path: &Path, fallback: &str) -> Result<String> {
    if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    } else {
        debug!("{} not found, using built-in template", path.display());
        Ok(fallback.to_string())
    }
}

/// Declare `params.project_identifier` just before `params.project_dir`
pub fn render_main_workflow(template: &str, project_id: &str) -> String {
    let identifier = format!("params.project_identifier = '{project_id}'");
    let mut lines: Vec<String> = template.lines().map(str::to_string).collect();

    let anchor = lines
        .iter()
        .position(|l| l.trim_end() == PROJECT_DIR_PARAM)
        .or_else(|| {
            lines
                .iter()
                .position(|l| l.trim_end() == PARAMETERS_MARKER)
                .map(|idx| idx + 1)
        });

    match anchor {
        Some(idx) => lines.insert(idx, identifier),
        None => lines.push(identifier),
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Prefix the engine config with the container settings and bind the mounts manifest
pub fn render_nextflow_config(template: &str, imgs_dir: &Path, mounts_config: &Path) -> String {
    let mut lines = vec![
        "manifest.mainScript = 'main.nf'".to_string(),
        String::new(),
        "singularity {".to_string(),
        format!("  cacheDir = \"{}\"", imgs_dir.display()),
        "  autoMount = 'true'".to_string(),
        "}".to_string(),
    ];
    lines.extend(template.lines().skip(1).map(str::to_string));

    let container_options = format!(
        "containerOptions = '-B `cat {}` --no-home'",
        mounts_config.display()
    );
    match lines.iter().position(|l| l.trim_end() == "process {") {
        Some(idx) => lines.insert(idx + 1, container_options),
        None => {
            lines.push("process {".to_string());
            lines.push(container_options);
            lines.push("}".to_string());
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
