//! RAFT configuration
//!
//! A RAFT installation is anchored at a directory holding `.raft.cfg`, a JSON
//! document that maps logical names to filesystem locations and module
//! repositories. `raft setup` writes it; every other command loads it once.

pub mod setup;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::RaftError;

pub use setup::{run_setup, SetupOptions};

pub const CONFIG_FILE: &str = ".raft.cfg";
pub const INIT_CONFIG_FILE: &str = ".init.cfg";
pub const INIT_WORKFLOW_FILE: &str = ".init.wf";
pub const NEXTFLOW_CONFIG_TEMPLATE_FILE: &str = ".nextflow.config";

pub const DEFAULT_MODULE_REPO: &str = "nextflow_modules";
pub const DEFAULT_MODULE_REPO_URL: &str =
    "https://gitlab.com/landscape-of-effective-neoantigens-software/nextflow/modules";
pub const DEFAULT_SUBGROUPS_KEY: &str = "nextflow_module_subgroups";
pub const DEFAULT_SUBGROUPS: [&str; 3] = ["Tools", "Projects", "Datasets"];

/// Logical filesystem entries created by `raft setup`.
pub const FILESYSTEM_KEYS: [&str; 6] = [
    "projects",
    "references",
    "fastqs",
    "imgs",
    "metadata",
    "shared",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RaftConfig {
    pub filesystem: BTreeMap<String, PathBuf>,
    pub nextflow_repos: BTreeMap<String, String>,
    pub nextflow_subgroups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub analysis_repos: BTreeMap<String, String>,
}

impl RaftConfig {
    /// Default configuration for an installation rooted at `raft_dir`
    pub fn with_defaults(raft_dir: &Path) -> Self {
        let filesystem = FILESYSTEM_KEYS
            .iter()
            .map(|key| (key.to_string(), raft_dir.join(key)))
            .collect();

        let mut nextflow_repos = BTreeMap::new();
        nextflow_repos.insert(
            DEFAULT_MODULE_REPO.to_string(),
            DEFAULT_MODULE_REPO_URL.to_string(),
        );

        let mut nextflow_subgroups = BTreeMap::new();
        nextflow_subgroups.insert(
            DEFAULT_SUBGROUPS_KEY.to_string(),
            DEFAULT_SUBGROUPS.iter().map(|s| s.to_string()).collect(),
        );

        Self {
            filesystem,
            nextflow_repos,
            nextflow_subgroups,
            analysis_repos: BTreeMap::new(),
        }
    }

    pub fn config_path(raft_dir: &Path) -> PathBuf {
        raft_dir.join(CONFIG_FILE)
    }

    /// Load `.raft.cfg` from the installation directory
    pub fn load(raft_dir: &Path) -> Result<Self> {
        let path = Self::config_path(raft_dir);
        if !path.is_file() {
            return Err(RaftError::ConfigMissing { path }.into());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        let config: RaftConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse configuration {}", path.display()))?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write `.raft.cfg` with 4-space indentation
    pub fn save(&self, raft_dir: &Path) -> Result<PathBuf> {
        let path = Self::config_path(raft_dir);
        write_json_pretty(&path, self)?;
        Ok(path)
    }

    /// Look up a logical filesystem entry
    pub fn filesystem_path(&self, key: &str) -> Result<&Path> {
        self.filesystem
            .get(key)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                RaftError::ConfigKeyMissing {
                    section: "filesystem",
                    key: key.to_string(),
                }
                .into()
            })
    }

    /// Look up a module repository URL by its logical name
    pub fn module_repo_url(&self, name: &str) -> Result<&str> {
        self.nextflow_repos
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| {
                RaftError::ConfigKeyMissing {
                    section: "nextflow_repos",
                    key: name.to_string(),
                }
                .into()
            })
    }

    /// Subgroups tried, in order, when cloning from repository `repo`.
    ///
    /// `nextflow_modules` pairs with `nextflow_module_subgroups`; other
    /// repositories use `<repo>_subgroups`. Falls back to the default list.
    pub fn module_subgroups(&self, repo: &str) -> Vec<String> {
        let singular = repo.strip_suffix('s').unwrap_or(repo);
        let candidates = [
            format!("{repo}_subgroups"),
            format!("{singular}_subgroups"),
            DEFAULT_SUBGROUPS_KEY.to_string(),
        ];

        candidates
            .iter()
            .find_map(|key| self.nextflow_subgroups.get(key))
            .or_else(|| self.nextflow_subgroups.values().next())
            .cloned()
            .unwrap_or_default()
    }
}

/// Serialize `value` as JSON indented with four spaces
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    buf.push(b'\n');
    std::fs::write(path, buf).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
