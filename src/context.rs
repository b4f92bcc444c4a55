//! Per-invocation state handed to every command handler

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::RaftConfig;
use crate::error::RaftError;
use crate::project::{validate_project_id, ProjectLayout};
use crate::subprocess::SubprocessManager;

/// The installation directory, its configuration (loaded once) and the
/// subprocess layer used for git and nextflow.
#[derive(Clone)]
pub struct RaftContext {
    pub raft_dir: PathBuf,
    pub config: RaftConfig,
    pub subprocess: SubprocessManager,
}

impl RaftContext {
    pub fn new(raft_dir: PathBuf, config: RaftConfig, subprocess: SubprocessManager) -> Self {
        Self {
            raft_dir,
            config,
            subprocess,
        }
    }

    /// Load `.raft.cfg` from `raft_dir`
    pub fn load(raft_dir: &Path, subprocess: SubprocessManager) -> Result<Self> {
        let config = RaftConfig::load(raft_dir)?;
        Ok(Self::new(raft_dir.to_path_buf(), config, subprocess))
    }

    /// Resolve a configured filesystem entry; relative entries are anchored at the installation
    pub fn fs_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.raft_dir.join(self.config.filesystem_path(key)?))
    }

    pub fn projects_dir(&self) -> Result<PathBuf> {
        self.fs_path("projects")
    }

    /// Layout of project `id`, whether or not it exists yet
    pub fn project(&self, id: &str) -> Result<ProjectLayout> {
        validate_project_id(id)?;
        Ok(ProjectLayout::new(id, self.projects_dir()?.join(id)))
    }

    /// Layout of project `id`, failing when its directory is missing
    pub fn existing_project(&self, id: &str) -> Result<ProjectLayout> {
        let layout = self.project(id)?;
        if !layout.root().is_dir() {
            return Err(RaftError::ProjectNotFound {
                id: id.to_string(),
                projects_dir: self.projects_dir()?,
            }
            .into());
        }
        Ok(layout)
    }
}
