//! Project directory layout and lifecycle
//!
//! A project lives at `<projects>/<id>` and owns its workflow definition,
//! metadata, references, logs, outputs and a `.raft` state directory holding
//! the audit log.

pub mod assets;
pub mod audit;
pub mod init;
pub mod mounts;
pub mod parameters;
pub mod rename;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::error::RaftError;

pub use assets::{load_asset, update_mounts, AssetKind, AssetOutcome, LoadAssetOptions, LoadMode};
pub use init::{init_project, InitProjectOptions};
pub use mounts::MountManifest;
pub use parameters::{copy_parameters, CopyParametersOptions, ParameterSource};
pub use rename::rename_project;

pub const WORKFLOW_DIR: &str = "workflow";
pub const STATE_DIR: &str = ".raft";
pub const AUDIT_LOG: &str = "auto.raft";
pub const MOUNTS_CONFIG: &str = "mounts.config";
pub const NEXTFLOW_CONFIG: &str = "nextflow.config";
pub const MAIN_WORKFLOW: &str = "main";

/// Reject identifiers that would escape the projects directory
pub fn validate_project_id(id: &str) -> Result<()> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains('/')
        || id.contains('\\')
        || id.chars().any(char::is_whitespace);
    if invalid {
        return Err(RaftError::InvalidProjectId(id.to_string()).into());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    id: String,
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(id: &str, root: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            root,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn workflow_dir(&self) -> PathBuf {
        self.dir(WORKFLOW_DIR)
    }

    /// `workflow/<name>.nf`
    pub fn workflow_file(&self, name: &str) -> PathBuf {
        self.workflow_dir().join(format!("{name}.nf"))
    }

    pub fn main_workflow(&self) -> PathBuf {
        self.workflow_file(MAIN_WORKFLOW)
    }

    pub fn mounts_config(&self) -> PathBuf {
        self.workflow_dir().join(MOUNTS_CONFIG)
    }

    pub fn nextflow_config(&self) -> PathBuf {
        self.workflow_dir().join(NEXTFLOW_CONFIG)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.dir("metadata")
    }

    pub fn references_dir(&self) -> PathBuf {
        self.dir("references")
    }

    pub fn fastqs_dir(&self) -> PathBuf {
        self.dir("fastqs")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.dir("outputs")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir("logs")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.dir("work")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.dir("tmp")
    }

    pub fn rftpkgs_dir(&self) -> PathBuf {
        self.dir("rftpkgs")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir(STATE_DIR)
    }

    pub fn audit_log(&self) -> PathBuf {
        self.state_dir().join(AUDIT_LOG)
    }

    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.workflow_dir().join(module)
    }

    /// `workflow/<module>/<module>.nf`
    pub fn module_script(&self, module: &str) -> PathBuf {
        self.module_dir(module).join(format!("{module}.nf"))
    }

    /// `workflow/<module>/<module>.config`
    pub fn module_config(&self, module: &str) -> PathBuf {
        self.module_dir(module).join(format!("{module}.config"))
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.module_dir(module).is_dir()
    }

    /// Names of the module directories under `workflow/`, sorted
    pub fn loaded_modules(&self) -> Result<Vec<String>> {
        let dir = self.workflow_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut modules = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read {}", dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && !name.starts_with('.') {
                modules.push(name);
            }
        }
        modules.sort();
        Ok(modules)
    }
}

/// Rewrite references to project `old` as `new` in recorded command lines
/// and project-relative paths.
///
/// Command lines are rewritten token by token (`-p old`, `--project-id old`,
/// `--project-id=old`); paths are rewritten where they contain `projects/old`.
pub fn rewrite_project_id(text: &str, old: &str, new: &str) -> String {
    let old_path = format!("projects/{old}");
    let new_path = format!("projects/{new}");

    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        let rewritten = rewrite_id_arguments(body, old, new);
        out.push_str(&replace_path_component(&rewritten, &old_path, &new_path));
        out.push_str(newline);
    }
    out
}

fn rewrite_id_arguments(line: &str, old: &str, new: &str) -> String {
    let mut previous: Option<&str> = None;
    let mut words = Vec::new();
    for word in line.split(' ') {
        let replaced = if matches!(previous, Some("-p") | Some("--project-id")) && word == old {
            new.to_string()
        } else if word.strip_prefix("--project-id=") == Some(old) {
            format!("--project-id={new}")
        } else {
            word.to_string()
        };
        previous = Some(word);
        words.push(replaced);
    }
    words.join(" ")
}

/// Replace `old_path` only where it ends at a path boundary
fn replace_path_component(text: &str, old_path: &str, new_path: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(old_path) {
        let after = &rest[idx + old_path.len()..];
        let boundary = after
            .chars()
            .next()
            .map_or(true, |c| matches!(c, '/' | '"' | '\'' | ',' | ' ' | '`'));
        out.push_str(&rest[..idx]);
        out.push_str(if boundary { new_path } else { old_path });
        rest = after;
    }
    out.push_str(rest);
    out
}
